//! Resolve missing context against EC2.
//!
//! Only read-only `Describe*` calls are made. Credentials and the default
//! region come from the standard AWS configuration chain; each request is
//! sent to the region named in its lookup key.

use super::{ContextStore, LookupRequest, MissingContext, SubnetContext, VpcContext};
use crate::error::{Error, Result};
use aws_config::BehaviorVersion;
use aws_sdk_ec2::types::Filter;
use aws_sdk_ec2::Client;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

async fn create_client(region: &str) -> Client {
    let config = aws_config::defaults(BehaviorVersion::latest())
        .region(aws_sdk_ec2::config::Region::new(region.to_string()))
        .load()
        .await;
    Client::new(&config)
}

/// Resolve a single lookup
pub async fn resolve(request: &LookupRequest) -> Result<serde_json::Value> {
    let client = create_client(request.region()).await;
    match request {
        LookupRequest::Vpc { vpc_id, .. } => {
            let vpc = describe_vpc(&client, request, vpc_id).await?;
            Ok(serde_json::to_value(vpc)?)
        }
        LookupRequest::Image { name, .. } => {
            let image_id = newest_image(&client, request, name).await?;
            Ok(serde_json::Value::String(image_id))
        }
    }
}

/// Resolve every missing lookup and store the answers; returns how many were stored
pub async fn refresh(store: &mut ContextStore, missing: &[MissingContext]) -> Result<usize> {
    let mut resolved = 0;
    for entry in missing {
        if store.get(&entry.key).is_some() {
            continue;
        }
        info!(key = %entry.key, "Resolving context");
        let value = resolve(&entry.request).await?;
        store.set(entry.key.clone(), value);
        resolved += 1;
    }
    Ok(resolved)
}

async fn describe_vpc(client: &Client, request: &LookupRequest, vpc_id: &str) -> Result<VpcContext> {
    let key = request.key();
    let vpcs = client
        .describe_vpcs()
        .vpc_ids(vpc_id)
        .send()
        .await
        .map_err(|e| Error::lookup_failed(&key, format!("Failed to describe VPC: {}", e)))?;
    let vpc = vpcs
        .vpcs()
        .first()
        .ok_or_else(|| Error::lookup_failed(&key, format!("VPC '{}' not found", vpc_id)))?;

    let subnets = client
        .describe_subnets()
        .filters(Filter::builder().name("vpc-id").values(vpc_id).build())
        .send()
        .await
        .map_err(|e| Error::lookup_failed(&key, format!("Failed to describe subnets: {}", e)))?;

    let mut subnets: Vec<SubnetContext> = subnets
        .subnets()
        .iter()
        .filter_map(|subnet| {
            Some(SubnetContext {
                subnet_id: subnet.subnet_id()?.to_string(),
                availability_zone: subnet.availability_zone()?.to_string(),
                cidr: subnet.cidr_block().map(str::to_string),
                public: subnet.map_public_ip_on_launch().unwrap_or(false),
            })
        })
        .collect();
    subnets.sort_by(|a, b| {
        (a.availability_zone.as_str(), a.subnet_id.as_str())
            .cmp(&(b.availability_zone.as_str(), b.subnet_id.as_str()))
    });
    debug!(vpc_id, subnets = subnets.len(), "Described VPC");

    Ok(VpcContext {
        vpc_id: vpc_id.to_string(),
        vpc_cidr_block: vpc.cidr_block().map(str::to_string),
        subnets,
    })
}

async fn newest_image(client: &Client, request: &LookupRequest, pattern: &str) -> Result<String> {
    let key = request.key();
    let images = client
        .describe_images()
        .owners("self")
        .filters(Filter::builder().name("name").values(pattern).build())
        .send()
        .await
        .map_err(|e| Error::lookup_failed(&key, format!("Failed to describe images: {}", e)))?;

    let matcher = glob::Pattern::new(pattern)
        .map_err(|e| Error::lookup_failed(&key, format!("invalid image name pattern: {}", e)))?;

    images
        .images()
        .iter()
        .filter(|image| image.name().map(|n| matcher.matches(n)).unwrap_or(false))
        .filter_map(|image| {
            let created = image
                .creation_date()
                .and_then(|d| DateTime::parse_from_rfc3339(d).ok())
                .map(|d| d.with_timezone(&Utc))?;
            Some((created, image.image_id()?.to_string()))
        })
        .max_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)))
        .map(|(_, id)| id)
        .ok_or_else(|| Error::lookup_failed(&key, format!("no image matches '{}'", pattern)))
}
