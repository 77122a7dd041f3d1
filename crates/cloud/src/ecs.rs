//! [`TaskLauncher`] over ECS `RunTask`.

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_ecs::types::{
    AwsVpcConfiguration, ContainerOverride, Failure, KeyValuePair, LaunchType,
    NetworkConfiguration, TaskOverride,
};
use aws_sdk_ecs::Client;
use pipeline::{LaunchAcknowledgement, LaunchRequest, RelayError, TaskLauncher};
use tracing::{info, warn};

use crate::CloudError;

const SERVICE: &str = "ECS";

fn describe(failure: &Failure) -> String {
    let mut text = failure.reason().unwrap_or("unknown reason").to_string();
    if let Some(detail) = failure.detail() {
        text.push_str(&format!(" ({detail})"));
    }
    if let Some(arn) = failure.arn() {
        text.push_str(&format!(" [{arn}]"));
    }
    text
}

/// Launches one-shot Fargate tasks.
#[derive(Debug, Clone)]
pub struct EcsTaskLauncher {
    client: Client,
}

impl EcsTaskLauncher {
    pub fn new(config: &SdkConfig) -> Self {
        Self {
            client: Client::new(config),
        }
    }

    async fn run_task(&self, request: &LaunchRequest) -> Result<LaunchAcknowledgement, CloudError> {
        let subnets = request.subnets.iter().map(|s| s.to_string()).collect();
        let vpc = AwsVpcConfiguration::builder()
            .set_subnets(Some(subnets))
            .build()
            .map_err(|e| CloudError::invalid_request(SERVICE, e))?;
        let environment = request
            .environment
            .iter()
            .map(|var| KeyValuePair::builder().name(&var.name).value(&var.value).build())
            .collect();
        let overrides = TaskOverride::builder()
            .container_overrides(
                ContainerOverride::builder()
                    .name(request.container_name.as_str())
                    .set_environment(Some(environment))
                    .build(),
            )
            .build();

        let output = self
            .client
            .run_task()
            .launch_type(LaunchType::from(request.launch_type.as_str()))
            .task_definition(request.task_definition.as_str())
            .cluster(request.cluster.as_str())
            .network_configuration(NetworkConfiguration::builder().awsvpc_configuration(vpc).build())
            .overrides(overrides)
            .send()
            .await
            .map_err(|e| CloudError::from_sdk(SERVICE, e))?;

        // RunTask reports placement problems in the body of a 200 response.
        if !output.failures().is_empty() {
            let message = output
                .failures()
                .iter()
                .map(describe)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(CloudError::Rejected {
                service: SERVICE,
                message,
            });
        }

        Ok(LaunchAcknowledgement {
            task_handles: output
                .tasks()
                .iter()
                .filter_map(|t| t.task_arn().map(str::to_string))
                .collect(),
        })
    }
}

#[async_trait]
impl TaskLauncher for EcsTaskLauncher {
    async fn launch(&self, request: &LaunchRequest) -> Result<LaunchAcknowledgement, RelayError> {
        match self.run_task(request).await {
            Ok(ack) => {
                info!(
                    task_definition = %request.task_definition,
                    cluster = %request.cluster,
                    tasks = ?ack.task_handles,
                    "Task launched"
                );
                Ok(ack)
            }
            Err(e) => {
                warn!(task_definition = %request.task_definition, error = %e, "RunTask failed");
                Err(RelayError::LaunchFailed {
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
    use pipeline::fakes::{launch_config, release};
    use pipeline::launch_request;
    use serde_json::json;

    fn request() -> LaunchRequest {
        launch_request(&release("shared", "3.0.0"), &launch_config()).unwrap()
    }

    #[tokio::test]
    async fn run_task_carries_network_and_overrides() {
        let mock = MockService::start(
            200,
            r#"{"tasks":[{"taskArn":"arn:aws:ecs:eu-west-1:222222222222:task/ECSCluster/abc"}],"failures":[]}"#,
        )
        .await;
        let launcher = EcsTaskLauncher::new(&sdk_config_for(&mock));

        let ack = launcher.launch(&request()).await.unwrap();

        assert_eq!(
            ack.task_handles,
            vec!["arn:aws:ecs:eu-west-1:222222222222:task/ECSCluster/abc".to_string()]
        );
        let sent = mock.single_request();
        assert!(sent.signed_by_test_credentials());
        assert_eq!(
            sent.header("x-amz-target"),
            Some("AmazonEC2ContainerServiceV20141113.RunTask")
        );
        let body = sent.json();
        assert_eq!(body["launchType"], "FARGATE");
        assert_eq!(
            body["taskDefinition"],
            "arn:aws:ecs:eu-west-1:222222222222:task-definition/PullRequestCreatorTask:1"
        );
        assert_eq!(body["cluster"], "arn:aws:ecs:eu-west-1:222222222222:cluster/ECSCluster");
        assert_eq!(
            body["networkConfiguration"]["awsvpcConfiguration"]["subnets"],
            json!(["subnet-0a", "subnet-0b"])
        );
        assert_eq!(
            body["overrides"]["containerOverrides"],
            json!([{
                "name": "PullRequestCreatorContainer",
                "environment": [
                    { "name": "REPO_URL", "value": "https://git-codecommit.eu-west-1.amazonaws.com/v1/repos/DownstreamArtifact" },
                    { "name": "REPO_NAME", "value": "DownstreamArtifact" },
                    { "name": "REPO_REGION", "value": "eu-west-1" },
                    { "name": "ARTIFACT_VERSION", "value": "3.0.0" },
                    { "name": "ARTIFACT_ID", "value": "shared" }
                ]
            }])
        );
    }

    #[tokio::test]
    async fn failures_in_a_200_response_are_launch_failures() {
        let mock = MockService::start(
            200,
            r#"{"tasks":[],"failures":[{"reason":"RESOURCE:MEMORY","detail":"no capacity"}]}"#,
        )
        .await;
        let launcher = EcsTaskLauncher::new(&sdk_config_for(&mock));

        let err = launcher.launch(&request()).await.unwrap_err();

        match err {
            RelayError::LaunchFailed { reason } => {
                assert!(reason.contains("RESOURCE:MEMORY (no capacity)"), "{reason}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn service_error_is_a_launch_failure_without_retry() {
        let mock = MockService::start(
            400,
            r#"{"__type":"ClientException","message":"TaskDefinition not found."}"#,
        )
        .await;
        let launcher = EcsTaskLauncher::new(&sdk_config_for(&mock));

        let err = launcher.launch(&request()).await.unwrap_err();

        assert_eq!(
            err,
            RelayError::LaunchFailed {
                reason: "ECS returned ClientException: TaskDefinition not found.".to_string()
            }
        );
        assert_eq!(mock.requests().len(), 1, "no retry expected");
    }
}
