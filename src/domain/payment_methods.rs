use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    entity::payments::PaymentMethod,
    error::{AppError, AppResult},
};

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaymentMethodInfo {
    pub code: PaymentMethod,
    pub name: String,
    pub description: String,
    pub available: bool,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 3] = [
        PaymentMethod::Cod,
        PaymentMethod::Momo,
        PaymentMethod::BankTransfer,
    ];

    pub fn code(self) -> &'static str {
        match self {
            PaymentMethod::Cod => "COD",
            PaymentMethod::Momo => "MOMO",
            PaymentMethod::BankTransfer => "BANK_TRANSFER",
        }
    }

    /// Only cash on delivery is wired up; the wallet and bank flows are listed
    /// so clients can show them as upcoming.
    pub fn is_available(self) -> bool {
        matches!(self, PaymentMethod::Cod)
    }

    pub fn parse(code: &str) -> AppResult<Self> {
        Self::ALL
            .into_iter()
            .find(|method| method.code().eq_ignore_ascii_case(code.trim()))
            .ok_or_else(|| AppError::BadRequest(format!("Unknown payment method {code}")))
    }
}

pub fn ensure_available(method: PaymentMethod) -> AppResult<()> {
    if method.is_available() {
        Ok(())
    } else {
        Err(AppError::PaymentMethodUnavailable)
    }
}

pub fn catalogue() -> Vec<PaymentMethodInfo> {
    PaymentMethod::ALL
        .into_iter()
        .map(|code| {
            let (name, description) = match code {
                PaymentMethod::Cod => ("Cash on delivery", "Pay in cash when the order arrives"),
                PaymentMethod::Momo => ("MoMo wallet", "Pay with the MoMo e-wallet"),
                PaymentMethod::BankTransfer => ("Bank transfer", "Pay by bank transfer"),
            };
            PaymentMethodInfo {
                code,
                name: name.to_string(),
                description: description.to_string(),
                available: code.is_available(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_codes_case_insensitively() {
        assert_eq!(PaymentMethod::parse("cod").unwrap(), PaymentMethod::Cod);
        assert_eq!(
            PaymentMethod::parse("BANK_TRANSFER").unwrap(),
            PaymentMethod::BankTransfer
        );
        assert!(matches!(
            PaymentMethod::parse("paypal"),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn only_cod_is_accepted() {
        assert!(ensure_available(PaymentMethod::Cod).is_ok());
        assert!(matches!(
            ensure_available(PaymentMethod::Momo),
            Err(AppError::PaymentMethodUnavailable)
        ));
        let available: Vec<_> = catalogue().into_iter().filter(|m| m.available).collect();
        assert_eq!(available.len(), 1);
    }
}
