//! Quote lookup against the stooq CSV endpoint.

use std::time::Duration;

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum QuoteError {
    #[error("error calling quote service: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid quote service url: {0}")]
    Url(String),
    #[error("unexpected CSV format")]
    Format,
    #[error("required columns not found")]
    MissingColumns,
    #[error("invalid stock code")]
    UnknownSymbol,
    #[error("invalid price value: {0}")]
    InvalidPrice(String),
}

/// Anything that can turn a stock code into a quote sentence.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn quote(&self, stock_code: &str) -> Result<String, QuoteError>;
}

/// Turn a stooq CSV body into `"{SYMBOL} quote is ${close} per share"`.
///
/// The first non-empty line is the header, the second the values. Column
/// names are matched case-insensitively. A close of `N/D` means stooq does
/// not know the symbol.
pub fn parse_quote_csv(body: &str) -> Result<String, QuoteError> {
    let mut rows = body
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty());

    let header: Vec<&str> = rows.next().ok_or(QuoteError::Format)?.split(',').collect();
    let values: Vec<&str> = rows.next().ok_or(QuoteError::Format)?.split(',').collect();

    let column = |name: &str| {
        header
            .iter()
            .position(|h| h.trim().eq_ignore_ascii_case(name))
    };
    let (Some(symbol_idx), Some(close_idx)) = (column("symbol"), column("close")) else {
        return Err(QuoteError::MissingColumns);
    };

    let symbol = values.get(symbol_idx).ok_or(QuoteError::Format)?.trim();
    let close = values.get(close_idx).ok_or(QuoteError::Format)?.trim();

    if close.is_empty() || close == "N/D" {
        return Err(QuoteError::UnknownSymbol);
    }
    if close.parse::<f64>().is_err() {
        return Err(QuoteError::InvalidPrice(close.to_string()));
    }

    Ok(format!(
        "{} quote is ${} per share",
        symbol.to_uppercase(),
        close
    ))
}

/// HTTP client for `{base}/q/l/?s={code}&f=sd2t2ohlcv&h&e=csv`.
pub struct StooqClient {
    http: reqwest::Client,
    base_url: String,
}

impl StooqClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, QuoteError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn quote_url(&self, stock_code: &str) -> Result<reqwest::Url, QuoteError> {
        let mut url = reqwest::Url::parse(&format!("{}/q/l/", self.base_url))
            .map_err(|e| QuoteError::Url(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("s", &stock_code.to_lowercase())
            .append_pair("f", "sd2t2ohlcv")
            .append_key_only("h")
            .append_pair("e", "csv");
        Ok(url)
    }
}

#[async_trait]
impl QuoteSource for StooqClient {
    async fn quote(&self, stock_code: &str) -> Result<String, QuoteError> {
        let url = self.quote_url(stock_code)?;
        tracing::debug!(%url, "fetching quote");
        let body = self
            .http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_quote_csv(&body)
    }
}
