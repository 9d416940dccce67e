use std::str::FromStr;

use crate::{
    entity::{orders::OrderStatus, payments::PaymentStatus},
    error::{AppError, AppResult},
};

/// Result of an accepted transition: the new order status and, when the
/// payment mirrors the change, its new status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub order: OrderStatus,
    pub payment: Option<PaymentStatus>,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Pending,
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::Delivering,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Delivering => "delivering",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Outgoing edges. Forward progress may skip steps; only a pending order
    /// can be cancelled.
    pub fn next_states(self) -> &'static [OrderStatus] {
        use OrderStatus::*;
        match self {
            Pending => &[Confirmed, Preparing, Delivering, Completed, Cancelled],
            Confirmed => &[Preparing, Delivering, Completed],
            Preparing => &[Delivering, Completed],
            Delivering => &[Completed],
            Completed | Cancelled => &[],
        }
    }

    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        self.next_states().contains(&next)
    }
}

impl FromStr for OrderStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or_else(|| AppError::InvalidStatus(value.to_string()))
    }
}

fn check_edge(from: OrderStatus, to: OrderStatus) -> AppResult<()> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(AppError::InvalidTransition { from, to })
    }
}

/// Customer cancellation. Ownership is checked by the caller before the order is read.
pub fn cancel(current: OrderStatus) -> AppResult<Transition> {
    check_edge(current, OrderStatus::Cancelled)?;
    Ok(Transition {
        order: OrderStatus::Cancelled,
        payment: Some(PaymentStatus::Cancelled),
    })
}

/// Administrative move. Only `completed` touches the payment, marking it paid.
pub fn admin_update(current: OrderStatus, next: OrderStatus) -> AppResult<Transition> {
    check_edge(current, next)?;
    let payment = match next {
        OrderStatus::Completed => Some(PaymentStatus::Paid),
        _ => None,
    };
    Ok(Transition {
        order: next,
        payment,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_order_can_be_cancelled() {
        let t = cancel(OrderStatus::Pending).unwrap();
        assert_eq!(t.order, OrderStatus::Cancelled);
        assert_eq!(t.payment, Some(PaymentStatus::Cancelled));
    }

    #[test]
    fn only_pending_orders_can_be_cancelled() {
        for status in OrderStatus::ALL {
            if status == OrderStatus::Pending {
                continue;
            }
            assert!(
                matches!(cancel(status), Err(AppError::InvalidTransition { .. })),
                "{status:?} should not be cancellable"
            );
        }
    }

    #[test]
    fn completing_marks_payment_paid() {
        let t = admin_update(OrderStatus::Delivering, OrderStatus::Completed).unwrap();
        assert_eq!(t.order, OrderStatus::Completed);
        assert_eq!(t.payment, Some(PaymentStatus::Paid));
    }

    #[test]
    fn other_forward_moves_leave_payment_alone() {
        for (from, to) in [
            (OrderStatus::Pending, OrderStatus::Confirmed),
            (OrderStatus::Pending, OrderStatus::Delivering),
            (OrderStatus::Confirmed, OrderStatus::Preparing),
            (OrderStatus::Preparing, OrderStatus::Delivering),
            (OrderStatus::Pending, OrderStatus::Cancelled),
        ] {
            assert_eq!(admin_update(from, to).unwrap().payment, None);
        }
    }

    #[test]
    fn steps_may_be_skipped() {
        assert!(admin_update(OrderStatus::Pending, OrderStatus::Completed).is_ok());
        assert!(admin_update(OrderStatus::Confirmed, OrderStatus::Delivering).is_ok());
    }

    #[test]
    fn terminal_states_have_no_exits() {
        for terminal in [OrderStatus::Completed, OrderStatus::Cancelled] {
            assert!(terminal.next_states().is_empty());
            for to in OrderStatus::ALL {
                assert!(matches!(
                    admin_update(terminal, to),
                    Err(AppError::InvalidTransition { .. })
                ));
            }
        }
    }

    #[test]
    fn backwards_and_self_edges_are_rejected() {
        assert!(admin_update(OrderStatus::Delivering, OrderStatus::Confirmed).is_err());
        assert!(admin_update(OrderStatus::Preparing, OrderStatus::Preparing).is_err());
        assert!(admin_update(OrderStatus::Confirmed, OrderStatus::Cancelled).is_err());
    }

    #[test]
    fn parses_only_known_statuses() {
        assert_eq!("delivering".parse::<OrderStatus>().unwrap(), OrderStatus::Delivering);
        assert!(matches!(
            "shipped".parse::<OrderStatus>(),
            Err(AppError::InvalidStatus(s)) if s == "shipped"
        ));
        assert!("Completed".parse::<OrderStatus>().is_err());
    }
}
