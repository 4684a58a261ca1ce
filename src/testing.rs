//! Shared fixtures for unit tests.

use crate::parameters::{PropertiesFile, Parameters};

/// Parameter file used across unit tests
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

pub fn sample_parameters() -> Parameters {
    let file = PropertiesFile::parse(SAMPLE_PROPERTIES, "parameters.properties")
        .expect("sample properties parse");
    Parameters::from_properties(&file).expect("sample parameters are valid")
}
