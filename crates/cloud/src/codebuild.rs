//! [`BuildStarter`] over CodeBuild `StartBuild`.

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_codebuild::Client;
use pipeline::{BuildHandle, BuildStarter, BuildTrigger, RelayError};
use tracing::{info, warn};

use crate::CloudError;

const SERVICE: &str = "CodeBuild";

#[derive(Debug, Clone)]
pub struct CodeBuildStarter {
    client: Client,
}

impl CodeBuildStarter {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }

    async fn start(&self, trigger: &BuildTrigger) -> Result<BuildHandle, CloudError> {
        let output = self
            .client
            .start_build()
            .project_name(trigger.project.as_str())
            .source_version(trigger.source_version.as_str())
            .send()
            .await
            .map_err(|e| CloudError::from_sdk(SERVICE, e))?;

        output
            .build_value()
            .and_then(|build| build.id())
            .map(|id| BuildHandle(id.to_string()))
            .ok_or(CloudError::Rejected {
                service: SERVICE,
                message: "response carried no build id".to_string(),
            })
    }
}

#[async_trait]
impl BuildStarter for CodeBuildStarter {
    async fn start_build(&self, trigger: &BuildTrigger) -> Result<BuildHandle, RelayError> {
        match self.start(trigger).await {
            Ok(handle) => {
                info!(
                    project = %trigger.project,
                    source_version = %trigger.source_version,
                    build_id = %handle.0,
                    "Build started"
                );
                Ok(handle)
            }
            Err(e) => {
                warn!(project = %trigger.project, error = %e, "StartBuild failed");
                Err(RelayError::BuildStartFailed {
                    project: trigger.project.to_string(),
                    reason: e.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sdk_config_for, MockService};
    use pipeline::fakes::BUILD_PROJECT;
    use pipeline::{GitRef, ProjectName};

    fn trigger() -> BuildTrigger {
        BuildTrigger {
            project: ProjectName::new(BUILD_PROJECT).unwrap(),
            source_version: GitRef::new("refs/heads/library_update_3.0.0").unwrap(),
        }
    }

    #[tokio::test]
    async fn start_build_sends_project_and_source_version() {
        let mock = MockService::start(
            200,
            r#"{"build":{"id":"DownstreamArtifactBuild:0b1c","buildStatus":"IN_PROGRESS"}}"#,
        )
        .await;
        let starter = CodeBuildStarter::new(&sdk_config_for(&mock));

        let handle = starter.start_build(&trigger()).await.unwrap();

        assert_eq!(handle, BuildHandle("DownstreamArtifactBuild:0b1c".to_string()));
        let sent = mock.single_request();
        assert!(sent.signed_by_test_credentials());
        assert_eq!(sent.header("x-amz-target"), Some("CodeBuild_20161006.StartBuild"));
        let body = sent.json();
        assert_eq!(body["projectName"], "DownstreamArtifactBuild");
        assert_eq!(body["sourceVersion"], "refs/heads/library_update_3.0.0");
    }

    #[tokio::test]
    async fn unknown_project_is_a_build_start_failure() {
        let mock = MockService::start(
            400,
            r#"{"__type":"ResourceNotFoundException","message":"Project cannot be found"}"#,
        )
        .await;
        let starter = CodeBuildStarter::new(&sdk_config_for(&mock));

        let err = starter.start_build(&trigger()).await.unwrap_err();

        assert_eq!(
            err,
            RelayError::BuildStartFailed {
                project: BUILD_PROJECT.to_string(),
                reason: "CodeBuild returned ResourceNotFoundException: Project cannot be found"
                    .to_string(),
            }
        );
        assert_eq!(mock.requests().len(), 1);
    }

    #[tokio::test]
    async fn response_without_build_id_is_rejected() {
        let mock = MockService::start(200, r#"{"build":{"buildStatus":"IN_PROGRESS"}}"#).await;
        let starter = CodeBuildStarter::new(&sdk_config_for(&mock));

        let err = starter.start_build(&trigger()).await.unwrap_err();

        match err {
            RelayError::BuildStartFailed { reason, .. } => {
                assert_eq!(reason, "CodeBuild rejected the request: response carried no build id");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
