use chrono::Utc;
use sea_orm::ActiveValue::{NotSet, Set};
use uuid::Uuid;

use super::{discount::VoucherQuote, snapshot::CartSnapshot};
use crate::entity::{
    order_items::ActiveModel as OrderItemActive,
    orders::{ActiveModel as OrderActive, OrderStatus},
    payments::{ActiveModel as PaymentActive, PaymentMethod, PaymentStatus},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShippingInfo {
    pub full_name: String,
    pub phone: String,
    pub address: String,
    pub note: Option<String>,
}

/// Rows for one order, ready to be inserted in the checkout transaction.
#[derive(Debug, Clone)]
pub struct AssembledOrder {
    pub order_id: Uuid,
    pub invoice_number: String,
    pub subtotal: i64,
    pub discount: i64,
    pub total: i64,
    pub order: OrderActive,
    pub lines: Vec<OrderItemActive>,
    pub payment: PaymentActive,
}

pub fn assemble(
    user_id: Uuid,
    shipping: &ShippingInfo,
    payment_method: PaymentMethod,
    snapshot: &CartSnapshot,
    voucher: Option<&VoucherQuote>,
) -> AssembledOrder {
    let subtotal = snapshot.subtotal;
    let discount = voucher.map_or(0, |q| q.discount).clamp(0, subtotal);
    let total = subtotal - discount;

    let order_id = Uuid::new_v4();
    let invoice_number = build_invoice_number(order_id);

    let order = OrderActive {
        id: Set(order_id),
        user_id: Set(user_id),
        full_name: Set(shipping.full_name.clone()),
        phone: Set(shipping.phone.clone()),
        address: Set(shipping.address.clone()),
        note: Set(shipping.note.clone()),
        subtotal: Set(subtotal),
        discount: Set(discount),
        total: Set(total),
        voucher_id: Set(voucher.map(|q| q.voucher_id)),
        payment_method: Set(payment_method),
        status: Set(OrderStatus::Pending),
        invoice_number: Set(invoice_number.clone()),
        created_at: NotSet,
        updated_at: NotSet,
    };

    let lines = snapshot
        .lines
        .iter()
        .map(|line| OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            product_id: Set(line.product_id),
            quantity: Set(line.quantity),
            unit_price: Set(line.unit_price),
            created_at: NotSet,
        })
        .collect();

    let payment = PaymentActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(order_id),
        method: Set(payment_method),
        amount: Set(total),
        status: Set(PaymentStatus::Pending),
        transaction_id: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    };

    AssembledOrder {
        order_id,
        invoice_number,
        subtotal,
        discount,
        total,
        order,
        lines,
        payment,
    }
}

/// Unique because the order id is: the whole id is the suffix.
fn build_invoice_number(order_id: Uuid) -> String {
    let date = Utc::now().format("%Y%m%d");
    format!("INV-{}-{}", date, order_id.simple().to_string().to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        discount::RedemptionPlan,
        snapshot::{CartSnapshot, SnapshotLine},
    };

    fn shipping() -> ShippingInfo {
        ShippingInfo {
            full_name: "Ferris Crab".into(),
            phone: "0900000000".into(),
            address: "1 Harbour Road".into(),
            note: Some("ring twice".into()),
        }
    }

    fn snapshot() -> CartSnapshot {
        CartSnapshot::new(
            Uuid::new_v4(),
            vec![
                SnapshotLine {
                    product_id: Uuid::new_v4(),
                    quantity: 2,
                    unit_price: 50_000,
                },
                SnapshotLine {
                    product_id: Uuid::new_v4(),
                    quantity: 1,
                    unit_price: 25_000,
                },
            ],
        )
        .unwrap()
    }

    #[test]
    fn copies_every_cart_line_with_its_price() {
        let snap = snapshot();
        let user_id = Uuid::new_v4();
        let assembled = assemble(user_id, &shipping(), PaymentMethod::Cod, &snap, None);

        assert_eq!(assembled.lines.len(), snap.lines.len());
        for (line, source) in assembled.lines.iter().zip(&snap.lines) {
            assert_eq!(line.product_id.as_ref(), &source.product_id);
            assert_eq!(line.quantity.as_ref(), &source.quantity);
            assert_eq!(line.unit_price.as_ref(), &source.unit_price);
            assert_eq!(line.order_id.as_ref(), &assembled.order_id);
        }
        assert_eq!(assembled.order.user_id.as_ref(), &user_id);
        assert_eq!(assembled.order.status.as_ref(), &OrderStatus::Pending);
    }

    #[test]
    fn invoice_number_carries_the_whole_order_id() {
        let id = Uuid::new_v4();
        let invoice = build_invoice_number(id);
        assert!(invoice.starts_with("INV-"));
        assert!(invoice.ends_with(&id.simple().to_string().to_uppercase()));
        assert_ne!(invoice, build_invoice_number(Uuid::new_v4()));
    }

    #[test]
    fn totals_without_voucher() {
        let assembled = assemble(Uuid::new_v4(), &shipping(), PaymentMethod::Cod, &snapshot(), None);
        assert_eq!(assembled.subtotal, 125_000);
        assert_eq!(assembled.discount, 0);
        assert_eq!(assembled.total, 125_000);
        assert_eq!(assembled.order.voucher_id.as_ref(), &None);
    }

    #[test]
    fn payment_mirrors_order_total() {
        let quote = VoucherQuote {
            voucher_id: Uuid::new_v4(),
            code: "SAVE".into(),
            discount: 25_000,
            plan: RedemptionPlan::ClaimAndConsume,
        };
        let assembled = assemble(
            Uuid::new_v4(),
            &shipping(),
            PaymentMethod::Cod,
            &snapshot(),
            Some(&quote),
        );

        assert_eq!(assembled.total, 100_000);
        assert_eq!(assembled.order.total.as_ref(), &100_000);
        assert_eq!(assembled.order.discount.as_ref(), &25_000);
        assert_eq!(assembled.order.voucher_id.as_ref(), &Some(quote.voucher_id));
        assert_eq!(assembled.payment.amount.as_ref(), &100_000);
        assert_eq!(assembled.payment.status.as_ref(), &PaymentStatus::Pending);
        assert_eq!(assembled.payment.order_id.as_ref(), &assembled.order_id);
    }

    #[test]
    fn oversized_discount_never_makes_total_negative() {
        let quote = VoucherQuote {
            voucher_id: Uuid::new_v4(),
            code: "BIG".into(),
            discount: 10_000_000,
            plan: RedemptionPlan::ClaimAndConsume,
        };
        let assembled = assemble(
            Uuid::new_v4(),
            &shipping(),
            PaymentMethod::Cod,
            &snapshot(),
            Some(&quote),
        );
        assert_eq!(assembled.discount, assembled.subtotal);
        assert_eq!(assembled.total, 0);
    }

    #[test]
    fn invoice_number_has_date_and_short_id() {
        let assembled = assemble(Uuid::new_v4(), &shipping(), PaymentMethod::Cod, &snapshot(), None);
        let parts: Vec<&str> = assembled.invoice_number.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "INV");
        assert_eq!(parts[1].len(), 8);
        assert_eq!(parts[2].len(), 8);
    }
}
