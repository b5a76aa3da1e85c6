//! In-memory record sink
//!
//! Keeps a committed and a staged copy of every table. Inserts land in the
//! staged copy, `commit` merges it into the committed one and `rollback`
//! drops it. Order identities come from a counter that, like an
//! auto-increment column, is not rewound by a rollback. Sales and orders
//! must reference a stored customer and product, like foreign keys.

use crate::error::{EtlError, Result};
use crate::models::{
    CanonicalCustomer, CanonicalProduct, CanonicalSale, LinkedOrderItem, Order, OrderRef,
    SurrogateId,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

use super::RecordSink;

/// Table contents of a store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tables {
    pub customers: BTreeMap<SurrogateId, CanonicalCustomer>,
    pub products: BTreeMap<SurrogateId, CanonicalProduct>,
    pub sales: BTreeMap<String, CanonicalSale>,
    pub orders: BTreeMap<OrderRef, Order>,
    pub order_items: Vec<LinkedOrderItem>,
}

impl Tables {
    fn merge(&mut self, other: Tables) {
        self.customers.extend(other.customers);
        self.products.extend(other.products);
        self.sales.extend(other.sales);
        self.orders.extend(other.orders);
        self.order_items.extend(other.order_items);
    }

    fn is_empty(&self) -> bool {
        self.customers.is_empty()
            && self.products.is_empty()
            && self.sales.is_empty()
            && self.orders.is_empty()
            && self.order_items.is_empty()
    }
}

#[derive(Debug)]
pub struct InMemoryStore {
    committed: Tables,
    staged: Tables,
    next_order_ref: u64,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            committed: Tables::default(),
            staged: Tables::default(),
            next_order_ref: 1,
        }
    }

    /// Committed tables
    pub fn committed(&self) -> &Tables {
        &self.committed
    }

    /// Whether there is uncommitted work
    pub fn has_pending(&self) -> bool {
        !self.staged.is_empty()
    }

    /// Committed tables with the staged work applied
    pub fn snapshot(&self) -> Tables {
        let mut snapshot = self.committed.clone();
        snapshot.merge(self.staged.clone());
        snapshot
    }

    fn email_taken(&self, email: &str) -> bool {
        self.committed
            .customers
            .values()
            .chain(self.staged.customers.values())
            .any(|customer| customer.email == email)
    }

    fn customer_exists(&self, id: SurrogateId) -> bool {
        self.committed.customers.contains_key(&id) || self.staged.customers.contains_key(&id)
    }

    fn product_exists(&self, id: SurrogateId) -> bool {
        self.committed.products.contains_key(&id) || self.staged.products.contains_key(&id)
    }

    fn order_exists(&self, order_ref: OrderRef) -> bool {
        self.committed.orders.contains_key(&order_ref) || self.staged.orders.contains_key(&order_ref)
    }
}

impl RecordSink for InMemoryStore {
    fn insert_customers(&mut self, customers: &[CanonicalCustomer]) -> Result<usize> {
        let mut inserted = 0;
        for customer in customers {
            let id = customer.surrogate_id;
            if self.committed.customers.contains_key(&id) || self.staged.customers.contains_key(&id) {
                debug!("Ignoring customer {}: id already stored", customer.source_id);
                continue;
            }
            if self.email_taken(&customer.email) {
                debug!(
                    "Ignoring customer {}: email {} already stored",
                    customer.source_id, customer.email
                );
                continue;
            }
            self.staged.customers.insert(id, customer.clone());
            inserted += 1;
        }
        Ok(inserted)
    }

    fn insert_products(&mut self, products: &[CanonicalProduct]) -> Result<usize> {
        let mut inserted = 0;
        for product in products {
            let id = product.surrogate_id;
            if self.committed.products.contains_key(&id) || self.staged.products.contains_key(&id) {
                debug!("Ignoring product {}: id already stored", product.source_id);
                continue;
            }
            self.staged.products.insert(id, product.clone());
            inserted += 1;
        }
        Ok(inserted)
    }

    fn insert_sales(&mut self, sales: &[CanonicalSale]) -> Result<usize> {
        let mut inserted = 0;
        for sale in sales {
            let key = &sale.transaction_id;
            if self.committed.sales.contains_key(key) || self.staged.sales.contains_key(key) {
                debug!("Ignoring sale {}: already stored", key);
                continue;
            }
            if !self.customer_exists(sale.customer_ref) {
                return Err(EtlError::persistence(format!(
                    "sale {} references unknown customer {}",
                    key, sale.customer_ref
                )));
            }
            if !self.product_exists(sale.product_ref) {
                return Err(EtlError::persistence(format!(
                    "sale {} references unknown product {}",
                    key, sale.product_ref
                )));
            }
            self.staged.sales.insert(key.clone(), sale.clone());
            inserted += 1;
        }
        Ok(inserted)
    }

    fn insert_orders(&mut self, orders: &[Order]) -> Result<HashMap<String, OrderRef>> {
        if let Some(orphan) = orders.iter().find(|order| !self.customer_exists(order.customer_ref)) {
            return Err(EtlError::persistence(format!(
                "order {} references unknown customer {}",
                orphan.transaction_id, orphan.customer_ref
            )));
        }

        let mut refs = HashMap::with_capacity(orders.len());
        for order in orders {
            let order_ref = OrderRef(self.next_order_ref);
            self.next_order_ref += 1;
            self.staged.orders.insert(order_ref, order.clone());
            refs.insert(order.transaction_id.clone(), order_ref);
        }
        Ok(refs)
    }

    fn insert_order_items(&mut self, items: &[LinkedOrderItem]) -> Result<usize> {
        let known: HashSet<OrderRef> = items
            .iter()
            .map(|linked| linked.order_ref)
            .filter(|order_ref| self.order_exists(*order_ref))
            .collect();

        if let Some(orphan) = items.iter().find(|linked| !known.contains(&linked.order_ref)) {
            return Err(EtlError::persistence(format!(
                "order item of transaction {} references unknown order {}",
                orphan.item.transaction_id, orphan.order_ref
            )));
        }

        self.staged.order_items.extend(items.iter().cloned());
        Ok(items.len())
    }

    fn commit(&mut self) -> Result<()> {
        let staged = std::mem::take(&mut self.staged);
        self.committed.merge(staged);
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.staged = Tables::default();
        Ok(())
    }
}
