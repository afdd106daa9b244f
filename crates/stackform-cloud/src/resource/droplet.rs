//! Droplet (compute instance)

use super::{Resource, ResourceRequest, schema};
use crate::error::ResourceError;
use crate::provider::{ProviderClient, ProviderHandle};
use crate::registry::ResourceKind;
use crate::template::{ResourceDeclaration, describe_value};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use tracing::debug;

const FIELDS: &[&str] = &[
    "Name",
    "Region",
    "Size",
    "Image",
    "SSHKeys",
    "Backups",
    "IPv6",
    "PrivateNetworking",
    "Monitoring",
    "UserData",
    "Tags",
];

const IMAGE_FIELDS: &[&str] = &["Slug", "ID"];

/// Droplets are created first; most other resources attach to them.
const DROPLET_PRIORITY: i32 = 0;

/// Body of `POST /v2/droplets`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropletCreateRequest {
    pub name: String,
    pub region: String,
    pub size: String,
    pub image: DropletImage,
    /// `null` on the wire when no keys are declared
    pub ssh_keys: Option<Vec<DropletSshKey>>,
    pub backups: bool,
    pub ipv6: bool,
    pub private_networking: bool,
    pub monitoring: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub user_data: Option<String>,
    pub tags: Vec<String>,
}

/// Image selection, by slug or numeric image ID
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DropletImage {
    Id(u64),
    Slug(String),
}

/// SSH key selection, by numeric key ID or fingerprint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DropletSshKey {
    Id(u64),
    Fingerprint(String),
}

impl DropletSshKey {
    pub fn fingerprint(&self) -> Option<&str> {
        match self {
            DropletSshKey::Fingerprint(fp) => Some(fp),
            DropletSshKey::Id(_) => None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct DropletSchema {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Region", default)]
    region: String,
    #[serde(rename = "Size", default)]
    size: String,
    #[serde(rename = "Image", default)]
    image: Option<Value>,
    #[serde(rename = "SSHKeys", default)]
    ssh_keys: Vec<Value>,
    #[serde(rename = "Backups", default)]
    backups: bool,
    #[serde(rename = "IPv6", default)]
    ipv6: bool,
    #[serde(rename = "PrivateNetworking", default)]
    private_networking: bool,
    #[serde(rename = "Monitoring", default)]
    monitoring: bool,
    #[serde(rename = "UserData", default)]
    user_data: Option<String>,
    #[serde(rename = "Tags", default)]
    tags: Vec<String>,
}

/// Compute instance resource
#[derive(Debug, Clone)]
pub struct Droplet {
    pub priority: i32,
    pub request: Option<DropletCreateRequest>,
}

impl Default for Droplet {
    fn default() -> Self {
        Self {
            priority: DROPLET_PRIORITY,
            request: None,
        }
    }
}

impl Droplet {
    fn parse_image(value: Option<Value>) -> Result<DropletImage, ResourceError> {
        let invalid = |message: String| ResourceError::InvalidField {
            field: "Image".to_string(),
            message,
        };

        match value {
            None | Some(Value::Null) => Err(invalid("an image is required".to_string())),
            Some(Value::String(slug)) => Ok(DropletImage::Slug(slug)),
            Some(Value::Number(n)) => n
                .as_u64()
                .map(DropletImage::Id)
                .ok_or_else(|| invalid(format!("{} is not a valid image ID", n))),
            Some(Value::Mapping(image)) => {
                schema::check_fields(Some("Image"), &image, IMAGE_FIELDS)?;
                match (image.get("Slug"), image.get("ID")) {
                    (Some(Value::String(slug)), None) => Ok(DropletImage::Slug(slug.clone())),
                    (None, Some(id)) => id.as_u64().map(DropletImage::Id).ok_or_else(|| {
                        invalid(format!(
                            "ID must be a positive integer, got {}",
                            describe_value(id)
                        ))
                    }),
                    (Some(_), Some(_)) => {
                        Err(invalid("Slug and ID are mutually exclusive".to_string()))
                    }
                    (Some(other), None) => Err(invalid(format!(
                        "Slug must be a string, got {}",
                        describe_value(other)
                    ))),
                    (None, None) => Err(invalid("one of Slug or ID is required".to_string())),
                }
            }
            Some(other) => Err(invalid(format!(
                "expected a slug, an ID or a mapping, got {}",
                describe_value(&other)
            ))),
        }
    }

    // Declared order is kept: the provider treats the list as ordered.
    fn parse_ssh_keys(values: Vec<Value>) -> Result<Option<Vec<DropletSshKey>>, ResourceError> {
        if values.is_empty() {
            return Ok(None);
        }

        values
            .into_iter()
            .enumerate()
            .map(|(i, value)| match value {
                Value::String(fingerprint) => Ok(DropletSshKey::Fingerprint(fingerprint)),
                other => other.as_u64().map(DropletSshKey::Id).ok_or_else(|| {
                    ResourceError::InvalidField {
                        field: format!("SSHKeys[{}]", i),
                        message: format!(
                            "expected a fingerprint or key ID, got {}",
                            describe_value(&other)
                        ),
                    }
                }),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }
}

#[async_trait]
impl Resource for Droplet {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Droplet
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn build_request(
        &mut self,
        stack_name: &str,
        declaration: &ResourceDeclaration,
    ) -> Result<ResourceRequest, ResourceError> {
        let schema: DropletSchema = schema::decode(declaration, FIELDS)?;

        let image = Self::parse_image(schema.image)?;
        let ssh_keys = Self::parse_ssh_keys(schema.ssh_keys)?;

        let mut tags = vec![stack_name.to_string()];
        tags.extend(schema.tags.into_iter().filter(|t| t != stack_name));

        let request = DropletCreateRequest {
            name: schema.name,
            region: schema.region,
            size: schema.size,
            image,
            ssh_keys,
            backups: schema.backups,
            ipv6: schema.ipv6,
            private_networking: schema.private_networking,
            monitoring: schema.monitoring,
            user_data: schema.user_data,
            tags,
        };

        self.request = Some(request.clone());
        Ok(ResourceRequest::Droplet(request))
    }

    async fn build(&self, client: &dyn ProviderClient) -> Result<ProviderHandle, ResourceError> {
        let request = self.request.as_ref().ok_or(ResourceError::RequestNotBuilt)?;

        debug!(droplet = %request.name, region = %request.region, "Creating droplet");
        let created = client.create_droplet(request).await?;
        debug!(droplet = %request.name, id = created.id, "Droplet created");

        Ok(created.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::parse_template;

    const HEADER: &str = r#"
Parameters:
  StackName:
    Description: The name of the stack to deploy
    Type: String
    Default: FurnaceStack

Resources:
"#;

    fn declaration(body: &str) -> ResourceDeclaration {
        let template = parse_template(format!("{}{}", HEADER, body).as_bytes()).unwrap();
        template.resources.into_iter().next().unwrap()
    }

    fn build(body: &str) -> Result<DropletCreateRequest, ResourceError> {
        let mut droplet = Droplet::default();
        let request = droplet.build_request("TestStack", &declaration(body))?;
        Ok(request.as_droplet().cloned().unwrap())
    }

    #[test]
    fn test_ssh_key_fingerprints_keep_declared_order() {
        let request = build(
            r#"
  Droplet:
    Name: MyDroplet
    Type: Droplet
    Image:
      Slug: "ubuntu-14-04-x64"
    SSHKeys:
      - Fingerprint2
      - Fingerprint1
      - Fingerprint2
"#,
        )
        .unwrap();

        let keys = request.ssh_keys.unwrap();
        let fingerprints: Vec<&str> = keys.iter().filter_map(|k| k.fingerprint()).collect();
        assert_eq!(fingerprints, vec!["Fingerprint2", "Fingerprint1", "Fingerprint2"]);
    }

    #[test]
    fn test_ssh_keys_accept_ids() {
        let request = build(
            r#"
  Droplet:
    Name: MyDroplet
    Type: Droplet
    Image: ubuntu-22-04-x64
    SSHKeys: [512189, Fingerprint1]
"#,
        )
        .unwrap();

        assert_eq!(
            request.ssh_keys,
            Some(vec![
                DropletSshKey::Id(512189),
                DropletSshKey::Fingerprint("Fingerprint1".to_string())
            ])
        );
    }

    #[test]
    fn test_unknown_field_rejected() {
        let mut droplet = Droplet::default();
        let result = droplet.build_request(
            "TestStack",
            &declaration(
                r#"
  Droplet:
    Name: MyDroplet
    Type: Droplet
    Asdf: Bla
    Image:
      Slug: "ubuntu-14-04-x64"
"#,
            ),
        );

        assert_eq!(
            result,
            Err(ResourceError::UnknownField {
                field: "Asdf".to_string()
            })
        );
        assert!(droplet.request.is_none());
    }

    #[test]
    fn test_unknown_nested_image_field_rejected() {
        let result = build(
            r#"
  Droplet:
    Name: MyDroplet
    Type: Droplet
    Image:
      Slug: "ubuntu-14-04-x64"
      Distro: ubuntu
"#,
        );
        assert_eq!(
            result,
            Err(ResourceError::UnknownField {
                field: "Image.Distro".to_string()
            })
        );
    }

    #[test]
    fn test_image_by_id() {
        let request = build(
            r#"
  Droplet:
    Name: MyDroplet
    Type: Droplet
    Image:
      ID: 7555620
"#,
        )
        .unwrap();
        assert_eq!(request.image, DropletImage::Id(7555620));
    }

    #[test]
    fn test_image_required() {
        let result = build(
            r#"
  Droplet:
    Name: MyDroplet
    Type: Droplet
"#,
        );
        assert!(matches!(result, Err(ResourceError::InvalidField { field, .. }) if field == "Image"));
    }

    #[test]
    fn test_image_slug_and_id_conflict() {
        let result = build(
            r#"
  Droplet:
    Name: MyDroplet
    Type: Droplet
    Image:
      Slug: ubuntu
      ID: 1
"#,
        );
        assert!(matches!(result, Err(ResourceError::InvalidField { .. })));
    }

    #[test]
    fn test_name_required() {
        let result = build(
            r#"
  Droplet:
    Type: Droplet
    Image: ubuntu
"#,
        );
        assert!(matches!(result, Err(ResourceError::InvalidDeclaration(_))));
    }

    #[test]
    fn test_stack_name_tag_comes_first() {
        let request = build(
            r#"
  Droplet:
    Name: MyDroplet
    Type: Droplet
    Image: ubuntu
    Tags: [web, TestStack, frontend]
"#,
        )
        .unwrap();
        assert_eq!(request.tags, vec!["TestStack", "web", "frontend"]);
    }

    #[test]
    fn test_wire_format() {
        let request = build(
            r#"
  Droplet:
    Name: name
    Region: region
    Size: size
    Backups: false
    IPv6: false
    PrivateNetworking: false
    Monitoring: false
    Type: Droplet
    Image:
      Slug: "ubuntu-14-04-x64"
"#,
        )
        .unwrap();

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "name": "name",
                "region": "region",
                "size": "size",
                "image": "ubuntu-14-04-x64",
                "ssh_keys": null,
                "backups": false,
                "ipv6": false,
                "private_networking": false,
                "monitoring": false,
                "tags": ["TestStack"],
            })
        );
    }

    #[tokio::test]
    async fn test_build_without_request() {
        let droplet = Droplet::default();
        let client = crate::testing::RecordingProvider::new();
        let result = droplet.build(&client).await;
        tokio_test::assert_err!(&result);
        assert_eq!(result.unwrap_err(), ResourceError::RequestNotBuilt);
        assert!(client.requests().is_empty());
    }
}
