use async_trait::async_trait;
use aws_sdk_secretsmanager::types::{Filter, FilterNameStringType, SortOrderType};

use super::{ListPage, RemoteItem, SettingsStore};
use crate::error::{Result, SettingsError};

/// Reads settings from AWS Secrets Manager.
///
/// Secrets are listed by name prefix, ascending, with entries pending
/// deletion excluded. The listing only yields names and ARNs; every value
/// takes a separate `GetSecretValue` call, which is why this store defaults
/// to the concurrent strategy. Values may encode a JSON object of sub-keys.
pub struct SecretsManagerStore {
    client: aws_sdk_secretsmanager::Client,
    page_size: i32,
}

impl SecretsManagerStore {
    /// Creates a store from AWS configuration already loaded by the caller.
    pub fn new(config: &aws_config::SdkConfig, page_size: i32) -> Self {
        Self {
            client: aws_sdk_secretsmanager::Client::new(config),
            page_size,
        }
    }
}

#[async_trait]
impl SettingsStore for SecretsManagerStore {
    async fn list_page(&self, prefix: &str, continuation: Option<String>) -> Result<ListPage> {
        let name_filter = Filter::builder()
            .key(FilterNameStringType::Name)
            .values(prefix)
            .build();

        let resp = self
            .client
            .list_secrets()
            .filters(name_filter)
            .include_planned_deletion(false)
            .max_results(self.page_size)
            .sort_order(SortOrderType::Asc)
            .set_next_token(continuation)
            .send()
            .await
            .map_err(|e| SettingsError::listing(prefix, e))?;

        let mut items = Vec::with_capacity(resp.secret_list().len());
        for secret in resp.secret_list() {
            let Some(name) = secret.name() else { continue };
            // Fetch by ARN where available; the name works too but is not
            // unique across deletion/recreation cycles.
            let identifier = secret.arn().unwrap_or(name).to_string();
            items.push(RemoteItem {
                name: name.to_string(),
                identifier,
                inline_value: None,
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
            .get_secret_value()
            .secret_id(identifier)
            .send()
            .await
            .map_err(|e| SettingsError::value_fetch(identifier, e))?;

        // Binary-only secrets have no string form and cannot become settings.
        resp.secret_string()
            .map(str::to_string)
            .ok_or_else(|| SettingsError::MissingValue {
                name: identifier.to_string(),
            })
    }

    fn composite_values(&self) -> bool {
        true
    }
}
