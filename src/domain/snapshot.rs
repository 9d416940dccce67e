use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// One cart line priced against the catalogue at read time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotLine {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: i64,
}

impl SnapshotLine {
    pub fn line_total(&self) -> Option<i64> {
        self.unit_price.checked_mul(i64::from(self.quantity))
    }
}

/// Immutable view of an active cart taken inside the checkout transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartSnapshot {
    pub cart_id: Uuid,
    pub lines: Vec<SnapshotLine>,
    pub subtotal: i64,
}

impl CartSnapshot {
    pub fn new(cart_id: Uuid, lines: Vec<SnapshotLine>) -> AppResult<Self> {
        if lines.is_empty() {
            return Err(AppError::EmptyCart);
        }

        let mut subtotal: i64 = 0;
        for line in &lines {
            if line.quantity <= 0 {
                return Err(AppError::BadRequest(format!(
                    "Cart has invalid quantity for product {}",
                    line.product_id
                )));
            }
            subtotal = line
                .line_total()
                .and_then(|total| subtotal.checked_add(total))
                .ok_or_else(|| AppError::BadRequest("Cart total is too large".into()))?;
        }

        Ok(Self {
            cart_id,
            lines,
            subtotal,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(quantity: i32, unit_price: i64) -> SnapshotLine {
        SnapshotLine {
            product_id: Uuid::new_v4(),
            quantity,
            unit_price,
        }
    }

    #[test]
    fn subtotal_is_sum_of_quantity_times_price() {
        let snapshot =
            CartSnapshot::new(Uuid::new_v4(), vec![line(2, 120_000), line(1, 260_000)]).unwrap();
        assert_eq!(snapshot.subtotal, 500_000);
        assert_eq!(snapshot.lines.len(), 2);
    }

    #[test]
    fn no_lines_is_empty_cart() {
        let err = CartSnapshot::new(Uuid::new_v4(), Vec::new()).unwrap_err();
        assert!(matches!(err, AppError::EmptyCart));
    }

    #[test]
    fn overflowing_subtotal_is_rejected() {
        let err =
            CartSnapshot::new(Uuid::new_v4(), vec![line(2, i64::MAX / 2 + 1)]).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
