use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::debug;

/// Source of USD-based exchange rates.
#[async_trait]
pub trait RatesProvider: Send + Sync {
    async fn latest(&self) -> anyhow::Result<HashMap<String, Decimal>>;
}

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    rates: HashMap<String, Decimal>,
}

#[derive(Clone)]
pub struct HttpRatesProvider {
    client: reqwest::Client,
    url: String,
}

impl HttpRatesProvider {
    pub fn new(url: impl Into<String>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("build http client")?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl RatesProvider for HttpRatesProvider {
    async fn latest(&self) -> anyhow::Result<HashMap<String, Decimal>> {
        let body: LatestRatesResponse = self
            .client
            .get(&self.url)
            .send()
            .await
            .context("fetch exchange rates")?
            .error_for_status()
            .context("exchange rate api status")?
            .json()
            .await
            .context("decode exchange rates")?;
        debug!(count = body.rates.len(), "exchange rates fetched");
        Ok(body
            .rates
            .into_iter()
            .map(|(code, rate)| (code.to_uppercase(), rate))
            .collect())
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;

    /// Returns a fixed rate table.
    #[derive(Clone, Default)]
    pub struct StaticRates(pub HashMap<String, Decimal>);

    #[async_trait]
    impl RatesProvider for StaticRates {
        async fn latest(&self) -> anyhow::Result<HashMap<String, Decimal>> {
            Ok(self.0.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_exchange_rate_api_payload() {
        let raw = r#"{"base":"USD","date":"2024-06-01","rates":{"USD":1,"EUR":0.921,"JPY":157.2}}"#;
        let parsed: LatestRatesResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.rates["USD"], Decimal::ONE);
        assert_eq!(parsed.rates["EUR"], Decimal::new(921, 3));
        assert_eq!(parsed.rates["JPY"], Decimal::new(1572, 1));
    }
}
