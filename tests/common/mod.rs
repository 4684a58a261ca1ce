//! Shared fixtures for the devstation integration tests.
//!
//! ```rust,ignore
//! mod common;
//! use common::*;
//! ```

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use tempfile::TempDir;

use devstation::app::App;
use devstation::context::{ContextStore, DEFAULT_CONTEXT_FILE};
use devstation::parameters::{Parameters, DEFAULT_PARAMETERS_FILE};
use devstation::stacks::WorkstationStack;

/// A complete parameters file
pub const SAMPLE_PROPERTIES: &str = r#"[DEFAULT]
awsAccount = 123456789012
awsRegion = us-east-1
componentBucketName = demo-bucket
baseImageArn = arn:aws:imagebuilder:us-east-1:aws:image/amazon-linux-2-x86/x.x.x
codeCommitRepoName = workstation
imagePipelineName = %(personalName)s-images
personalName = jdoe
codeRepoBranchName = main
buildInstanceType = t3.large
developmentInstanceType = t3.medium
workstationVpcId = vpc-0123456789abcdef0
"#;

/// Image id cached for the workstation lookup
pub const SAMPLE_IMAGE_ID: &str = "ami-0a1b2c3d4e5f60718";

/// A project directory holding a parameters file
pub struct Project {
    pub dir: TempDir,
}

impl Project {
    pub fn new() -> Self {
        Self::with_properties(SAMPLE_PROPERTIES)
    }

    pub fn with_properties(content: &str) -> Self {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(DEFAULT_PARAMETERS_FILE), content).unwrap();
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn parameters_path(&self) -> PathBuf {
        self.path().join(DEFAULT_PARAMETERS_FILE)
    }

    pub fn context_path(&self) -> PathBuf {
        self.path().join(DEFAULT_CONTEXT_FILE)
    }

    pub fn outdir(&self) -> PathBuf {
        self.path().join("stack.out")
    }

    /// Write a context file answering every lookup
    pub fn write_context(&self) {
        complete_context(&sample_parameters())
            .save_to(self.context_path())
            .unwrap();
    }
}

/// Parameters parsed from [`SAMPLE_PROPERTIES`]
pub fn sample_parameters() -> Parameters {
    parameters_from(SAMPLE_PROPERTIES)
}

pub fn parameters_from(content: &str) -> Parameters {
    let project = Project::with_properties(content);
    Parameters::load(project.parameters_path(), &[]).unwrap()
}

/// Context answering the VPC and image lookups of `parameters`
pub fn complete_context(parameters: &Parameters) -> ContextStore {
    let workstation = WorkstationStack::new(parameters);
    let mut store = ContextStore::new();
    store.set(
        workstation.vpc_request().key(),
        json!({
            "vpcId": parameters.workstation.vpc_id,
            "vpcCidrBlock": "172.31.0.0/16",
            "subnets": [
                {"subnetId": "subnet-0aaa", "availabilityZone": "us-east-1a", "cidr": "172.31.0.0/20", "public": true},
                {"subnetId": "subnet-0eee", "availabilityZone": "us-east-1e", "cidr": "172.31.16.0/20", "public": true},
                {"subnetId": "subnet-0eef", "availabilityZone": "us-east-1e", "cidr": "172.31.32.0/20", "public": false}
            ]
        }),
    );
    store.set(workstation.image_request().key(), json!(SAMPLE_IMAGE_ID));
    store
}

/// Every stack declared from the sample parameters with a complete context
pub fn sample_app() -> App {
    let parameters = sample_parameters();
    App::from_parameters(&parameters, &complete_context(&parameters)).unwrap()
}
