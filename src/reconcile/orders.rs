//! Order aggregation
//!
//! Rebuilds parent orders and their line items from validated sales rows.
//! Rows sharing a transaction id form one order; every row becomes one item.

use crate::error::{EtlError, Result};
use crate::models::{CanonicalSale, LinkedOrderItem, Order, OrderItem, OrderRef};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// How to treat rows of one transaction that disagree on customer, date or status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupingPolicy {
    /// Take order header fields from the first row of the group
    #[default]
    FirstWins,
    /// Fail the batch when any row disagrees with the first
    Strict,
}

/// Orders and line items rebuilt from a sales batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatedOrders {
    pub orders: Vec<Order>,
    pub items: Vec<OrderItem>,
}

impl AggregatedOrders {
    pub fn order_count(&self) -> usize {
        self.orders.len()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }
}

/// Group sales by transaction id, in order of first appearance
pub fn group_by_transaction(sales: &[CanonicalSale]) -> Vec<Vec<&CanonicalSale>> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<Vec<&CanonicalSale>> = Vec::new();

    for sale in sales {
        match positions.get(sale.transaction_id.as_str()) {
            Some(&index) => groups[index].push(sale),
            None => {
                positions.insert(sale.transaction_id.as_str(), groups.len());
                groups.push(vec![sale]);
            }
        }
    }

    groups
}

/// Build one order per transaction and one item per sale row
pub fn aggregate_orders(sales: &[CanonicalSale], policy: GroupingPolicy) -> Result<AggregatedOrders> {
    let groups = group_by_transaction(sales);
    let mut aggregated = AggregatedOrders {
        orders: Vec::with_capacity(groups.len()),
        items: Vec::with_capacity(sales.len()),
    };

    for group in groups {
        // Groups are non-empty by construction
        let head = group[0];
        check_group_consistency(head, &group, policy)?;

        let mut total_amount = 0.0;
        for sale in &group {
            let subtotal = sale.subtotal();
            total_amount += subtotal;
            aggregated.items.push(OrderItem {
                transaction_id: sale.transaction_id.clone(),
                product_ref: sale.product_ref,
                quantity: sale.quantity,
                unit_price: sale.unit_price,
                subtotal,
            });
        }

        debug!(
            "Order {}: {} items, total {:.2}",
            head.transaction_id,
            group.len(),
            total_amount
        );

        aggregated.orders.push(Order {
            transaction_id: head.transaction_id.clone(),
            customer_ref: head.customer_ref,
            order_date: head.transaction_date,
            total_amount,
            status: head.status.clone(),
        });
    }

    info!(
        "Order aggregation complete: {} orders, {} items",
        aggregated.order_count(),
        aggregated.item_count()
    );

    Ok(aggregated)
}

fn check_group_consistency(
    head: &CanonicalSale,
    group: &[&CanonicalSale],
    policy: GroupingPolicy,
) -> Result<()> {
    let divergent_field = group.iter().skip(1).find_map(|sale| {
        if sale.customer_ref != head.customer_ref {
            Some("customer")
        } else if sale.transaction_date != head.transaction_date {
            Some("transaction date")
        } else if sale.status != head.status {
            Some("status")
        } else {
            None
        }
    });

    let Some(field) = divergent_field else {
        return Ok(());
    };

    match policy {
        GroupingPolicy::FirstWins => {
            warn!(
                "Transaction {} rows disagree on {}, using first row",
                head.transaction_id, field
            );
            Ok(())
        }
        GroupingPolicy::Strict => Err(EtlError::DivergentTransaction {
            transaction_id: head.transaction_id.clone(),
            field: field.to_string(),
        }),
    }
}

/// Attach persisted order identities to items.
///
/// Items whose order has no identity (the order was not persisted) are
/// skipped; the count of skipped items is returned alongside.
pub fn link_order_items(
    items: &[OrderItem],
    order_refs: &HashMap<String, OrderRef>,
) -> (Vec<LinkedOrderItem>, usize) {
    let mut skipped = 0;
    let linked = items
        .iter()
        .filter_map(|item| match order_refs.get(&item.transaction_id) {
            Some(&order_ref) => Some(LinkedOrderItem {
                order_ref,
                item: item.clone(),
            }),
            None => {
                skipped += 1;
                warn!(
                    "Skipping item of transaction {}: order was not persisted",
                    item.transaction_id
                );
                None
            }
        })
        .collect();

    (linked, skipped)
}
