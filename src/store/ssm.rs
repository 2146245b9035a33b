use async_trait::async_trait;

use super::{ListPage, RemoteItem, SettingsStore};
use crate::error::{Result, SettingsError};

/// Reads settings from AWS SSM Parameter Store.
///
/// Parameters are listed recursively under the path prefix with decryption
/// enabled, so `SecureString` values work out of the box as long as the
/// process has `ssm:GetParametersByPath` and the corresponding KMS
/// permissions. Values arrive inline with the listing and the pipeline
/// resolves them from there under either strategy; `get_value` maps to
/// `GetParameter` for trait completeness.
pub struct SsmParameterStore {
    client: aws_sdk_ssm::Client,
}

impl SsmParameterStore {
    /// Creates a store from AWS configuration already loaded by the caller
    /// (env vars, instance profile, etc.).
    pub fn new(config: &aws_config::SdkConfig) -> Self {
        Self {
            client: aws_sdk_ssm::Client::new(config),
        }
    }
}

#[async_trait]
impl SettingsStore for SsmParameterStore {
    /// One `GetParametersByPath` page. No explicit page size is sent; the
    /// service caps these pages at 10 parameters.
    async fn list_page(&self, prefix: &str, continuation: Option<String>) -> Result<ListPage> {
        let resp = self
            .client
            .get_parameters_by_path()
            .path(prefix)
            .recursive(true)
            .with_decryption(true)
            .set_next_token(continuation)
            .send()
            .await
            .map_err(|e| SettingsError::listing(prefix, e))?;

        let mut items = Vec::with_capacity(resp.parameters().len());
        for parameter in resp.parameters() {
            // A parameter without a name cannot be addressed; skip it.
            let Some(name) = parameter.name() else { continue };
            let value = parameter
                .value()
                .ok_or_else(|| SettingsError::MissingValue {
                    name: name.to_string(),
                })?
                .to_string();
            items.push(RemoteItem {
                name: name.to_string(),
                identifier: name.to_string(),
                inline_value: Some(value),
            });
        }

        Ok(ListPage {
            items,
            next_token: resp.next_token().map(str::to_string),
        })
    }

    async fn get_value(&self, identifier: &str) -> Result<String> {
        let resp = self
            .client
            .get_parameter()
            .name(identifier)
            .with_decryption(true)
            .send()
            .await
            .map_err(|e| SettingsError::value_fetch(identifier, e))?;

        resp.parameter()
            .and_then(|p| p.value())
            .map(str::to_string)
            .ok_or_else(|| SettingsError::MissingValue {
                name: identifier.to_string(),
            })
    }
}
