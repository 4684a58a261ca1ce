//! Deployment pipeline bound to a CodeCommit branch.
//!
//! Only the repository and branch come from parameters. The build itself is
//! whatever buildspec the repository carries; this stack wires a source stage
//! and a build stage together and starts the pipeline from an EventBridge
//! rule whenever the branch moves.

use super::{Stack, StackBuilder};
use crate::context::ContextStore;
use crate::error::Result;
use crate::parameters::Parameters;
use crate::resources::events::{Rule, Target};
use crate::resources::iam::{InlinePolicy, PolicyDocument, PolicyStatement, Role};
use crate::resources::pipeline::{
    Action, ActionTypeId, Artifact, ArtifactStore, Pipeline, Project, Stage,
};
use crate::resources::s3::Bucket;
use crate::template::{Expr, PseudoParameter};
use indexmap::IndexMap;
use serde_json::json;

const SOURCE_OUTPUT: &str = "SourceOutput";
const BUILD_OUTPUT: &str = "BuildOutput";

/// Name of the deployment pipeline stack
pub fn stack_name(parameters: &Parameters) -> String {
    format!("{}-deployment-pipeline", parameters.stack_prefix())
}

fn partition_arn(rest: String) -> Expr {
    Expr::join(
        "",
        vec![
            Expr::literal("arn:"),
            Expr::pseudo(PseudoParameter::Partition),
            Expr::literal(rest),
        ],
    )
}

fn service_role(service: &str, policy_name: &str, statements: Vec<PolicyStatement>) -> Role {
    let mut role = Role::for_service(service, &[]);
    role.policies.push(InlinePolicy {
        policy_name: policy_name.to_string(),
        policy_document: PolicyDocument::new(statements),
    });
    role
}

/// Declares the artifact bucket, build project, pipeline and repository hook
pub struct CodePipelineStack<'a> {
    parameters: &'a Parameters,
}

impl<'a> CodePipelineStack<'a> {
    pub fn new(parameters: &'a Parameters) -> Self {
        Self { parameters }
    }

    /// ARN of the source repository
    pub fn repository_arn(&self) -> Expr {
        let params = self.parameters;
        partition_arn(format!(
            ":codecommit:{}:{}:{}",
            params.aws_region, params.aws_account, params.code_commit_repo_name
        ))
    }
}

impl StackBuilder for CodePipelineStack<'_> {
    fn stack_name(&self) -> String {
        stack_name(self.parameters)
    }

    fn description(&self) -> Option<String> {
        Some(format!(
            "Deployment pipeline for {}@{}",
            self.parameters.code_commit_repo_name, self.parameters.code_repo_branch_name
        ))
    }

    fn declare(&self, stack: &mut Stack, _context: &ContextStore) -> Result<()> {
        let params = self.parameters;
        let repository_arn = self.repository_arn();

        let artifacts = stack.add("artifact-bucket", &Bucket::default())?;
        let artifact_objects = Expr::join("", vec![artifacts.arn(), Expr::literal("/*")]);

        let build_role = stack.add_at(
            &["build-role", "Resource"],
            &service_role(
                "codebuild.amazonaws.com",
                "build",
                vec![
                    PolicyStatement::allow(
                        &["logs:CreateLogGroup", "logs:CreateLogStream", "logs:PutLogEvents"],
                        vec![Expr::literal("*")],
                    ),
                    PolicyStatement::allow(
                        &["s3:GetObject", "s3:GetObjectVersion", "s3:PutObject"],
                        vec![artifact_objects.clone()],
                    ),
                ],
            ),
        )?;
        let project = stack.add("build-project", &Project::for_pipeline(build_role.arn()))?;

        let pipeline_role = stack.add_at(
            &["pipeline-role", "Resource"],
            &service_role(
                "codepipeline.amazonaws.com",
                "pipeline",
                vec![
                    PolicyStatement::allow(
                        &[
                            "codecommit:GetBranch",
                            "codecommit:GetCommit",
                            "codecommit:UploadArchive",
                            "codecommit:GetUploadArchiveStatus",
                            "codecommit:CancelUploadArchive",
                        ],
                        vec![repository_arn.clone()],
                    ),
                    PolicyStatement::allow(
                        &["codebuild:StartBuild", "codebuild:BatchGetBuilds"],
                        vec![project.arn()],
                    ),
                    PolicyStatement::allow(
                        &[
                            "s3:GetObject",
                            "s3:GetObjectVersion",
                            "s3:GetBucketVersioning",
                            "s3:PutObject",
                        ],
                        vec![artifacts.arn(), artifact_objects],
                    ),
                ],
            ),
        )?;

        let mut source_configuration = IndexMap::new();
        source_configuration.insert(
            "RepositoryName".to_string(),
            Expr::from(params.code_commit_repo_name.as_str()),
        );
        source_configuration.insert(
            "BranchName".to_string(),
            Expr::from(params.code_repo_branch_name.as_str()),
        );
        // Changes arrive through the EventBridge rule below
        source_configuration.insert("PollForSourceChanges".to_string(), Expr::from("false"));

        let mut build_configuration = IndexMap::new();
        build_configuration.insert("ProjectName".to_string(), project.reference());

        let pipeline = stack.add(
            "pipeline",
            &Pipeline {
                artifact_store: ArtifactStore::s3(artifacts.reference()),
                name: None,
                restart_execution_on_update: true,
                role_arn: pipeline_role.arn(),
                stages: vec![
                    Stage {
                        actions: vec![Action {
                            action_type_id: ActionTypeId::aws("Source", "CodeCommit"),
                            configuration: source_configuration,
                            input_artifacts: Vec::new(),
                            name: "Source".to_string(),
                            output_artifacts: vec![Artifact {
                                name: SOURCE_OUTPUT.to_string(),
                            }],
                            run_order: 1,
                        }],
                        name: "Source".to_string(),
                    },
                    Stage {
                        actions: vec![Action {
                            action_type_id: ActionTypeId::aws("Build", "CodeBuild"),
                            configuration: build_configuration,
                            input_artifacts: vec![Artifact {
                                name: SOURCE_OUTPUT.to_string(),
                            }],
                            name: "Build".to_string(),
                            output_artifacts: vec![Artifact {
                                name: BUILD_OUTPUT.to_string(),
                            }],
                            run_order: 1,
                        }],
                        name: "Build".to_string(),
                    },
                ],
            },
        )?;
        stack.add_depends_on(&pipeline, &pipeline_role)?;

        let pipeline_arn = Expr::join(
            "",
            vec![
                partition_arn(format!(":codepipeline:{}:{}:", params.aws_region, params.aws_account)),
                pipeline.reference(),
            ],
        );

        let events_role = stack.add_at(
            &["events-role", "Resource"],
            &service_role(
                "events.amazonaws.com",
                "start-pipeline",
                vec![PolicyStatement::allow(
                    &["codepipeline:StartPipelineExecution"],
                    vec![pipeline_arn.clone()],
                )],
            ),
        )?;

        stack.add(
            "repository-hook",
            &Rule {
                event_pattern: json!({
                    "source": ["aws.codecommit"],
                    "resources": [serde_json::to_value(&repository_arn)?],
                    "detail-type": ["CodeCommit Repository State Change"],
                    "detail": {
                        "event": ["referenceCreated", "referenceUpdated"],
                        "referenceType": ["branch"],
                        "referenceName": [params.code_repo_branch_name],
                    },
                }),
                state: "ENABLED".to_string(),
                targets: vec![Target {
                    arn: pipeline_arn,
                    id: "Target0".to_string(),
                    role_arn: Some(events_role.arn()),
                }],
            },
        )?;

        stack.add_output("PipelineName", pipeline.reference(), Some("Deployment pipeline"))?;
        Ok(())
    }
}
