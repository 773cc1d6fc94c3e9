use anyhow::{Context, anyhow};
use reqwest::Client;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{app_error::AppError, config::StripeConfig};

/// Payment session handle issued by the gateway. The `client_secret` is
/// handed to the browser to complete the charge; the service never sees
/// card data.
#[derive(Deserialize, Debug, ToSchema)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
}

/// Convert a major-unit amount to the gateway's minor-unit representation
/// (cents), rounding to the nearest cent.
pub fn to_minor_units(amount: f32) -> i64 {
    (f64::from(amount) * 100.0).round() as i64
}

pub async fn create_payment_intent(
    client: &Client,
    config: &StripeConfig,
    amount: f32,
) -> Result<PaymentIntent, AppError> {
    let params = [
        ("amount", to_minor_units(amount).to_string()),
        ("currency", config.currency.clone()),
        ("automatic_payment_methods[enabled]", "true".to_string()),
    ];

    let res = client
        .post(format!("{}/v1/payment_intents", config.api_url))
        .bearer_auth(&config.secret_key)
        .form(&params)
        .send()
        .await
        .map_err(|_| AppError::ServiceUnreachable("Stripe".into()))?;

    let status = res.status();
    if !status.is_success() {
        let body = res.text().await.unwrap_or_default();
        return Err(AppError::Other(anyhow!(
            "Stripe returned {status}: {body}"
        )));
    }

    let intent: PaymentIntent = res
        .json()
        .await
        .context("Failed to parse Stripe response")?;

    Ok(intent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_amounts_convert_to_cents() {
        assert_eq!(to_minor_units(50.0), 5000);
        assert_eq!(to_minor_units(0.0), 0);
    }

    #[test]
    fn fractional_amounts_round_to_nearest_cent() {
        assert_eq!(to_minor_units(19.99), 1999);
        assert_eq!(to_minor_units(0.1), 10);
        // 29.035 carries float noise; rounding must absorb it
        assert_eq!(to_minor_units(29.035), 2904);
    }
}
