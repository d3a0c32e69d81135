// dine-client/tests/common/mod.rs
// 集成测试共用的内存后端

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use dine_client::{ClientConfig, ClientError, ClientResult, OrderApi};
use shared::models::{
    CreateOrderRequest, Customization, DiningTable, Order, OrderItem, OrderItemInput, OrderQuery,
    OrderStatus, OrderType, PaymentStatus,
};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration as StdDuration;

/// Every request the backend saw, in order
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    List(OrderQuery),
    Create(CreateOrderRequest),
    Cancel(String),
    Status(String, OrderStatus),
    Payment(String, PaymentStatus),
    Kitchen,
    Tables,
}

struct State {
    orders: Vec<Order>,
    tables: Vec<DiningTable>,
    menu: HashMap<String, (String, f64)>,
    customizations: HashMap<String, String>,
    clock: DateTime<Utc>,
    next_id: u32,
    calls: Vec<Call>,
    fail_next_creates: u32,
    create_delay: StdDuration,
    hang: bool,
}

/// Whole-order backend kept in memory
///
/// Creates resolve names and prices from a small menu; every order gets a
/// creation time one minute after the previous one.
pub struct FakeBackend {
    state: Mutex<State>,
}

impl FakeBackend {
    pub fn new() -> Self {
        let menu = [
            ("m-pt", "Paneer Tikka", 250.0),
            ("m-naan", "Butter Naan", 40.0),
            ("m-dal", "Dal Makhani", 180.5),
        ]
        .into_iter()
        .map(|(id, name, price)| (id.to_string(), (name.to_string(), price)))
        .collect();
        let customizations = [("c-cheese", "Extra Cheese"), ("c-onion", "No Onion")]
            .into_iter()
            .map(|(id, name)| (id.to_string(), name.to_string()))
            .collect();

        Self {
            state: Mutex::new(State {
                orders: Vec::new(),
                tables: Vec::new(),
                menu,
                customizations,
                clock: Utc.with_ymd_and_hms(2026, 10, 19, 19, 0, 0).unwrap(),
                next_id: 1,
                calls: Vec::new(),
                fail_next_creates: 0,
                create_delay: StdDuration::ZERO,
                hang: false,
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Insert an order directly, bypassing the call log
    pub fn seed_order(
        &self,
        table_id: &str,
        order_type: OrderType,
        status: OrderStatus,
        items: Vec<OrderItemInput>,
    ) -> String {
        let mut state = self.lock();
        let order = state.build(table_id, order_type, &items);
        let id = order.id.clone();
        state.orders.push(Order { status, ..order });
        id
    }

    pub fn seed_table(&self, id: &str, name: &str) {
        self.lock().tables.push(DiningTable {
            id: id.into(),
            name: name.into(),
            capacity: 4,
            is_occupied: true,
            current_session_started_at: None,
        });
    }

    pub fn set_payment(&self, order_id: &str, status: PaymentStatus) {
        let mut state = self.lock();
        if let Some(order) = state.orders.iter_mut().find(|o| o.id == order_id) {
            order.payment_status = status;
        }
    }

    /// Change a status the way another client would
    pub fn set_status(&self, order_id: &str, status: OrderStatus) {
        let mut state = self.lock();
        if let Some(order) = state.orders.iter_mut().find(|o| o.id == order_id) {
            order.status = status;
        }
    }

    pub fn fail_next_creates(&self, n: u32) {
        self.lock().fail_next_creates = n;
    }

    /// Every create takes this long before the backend applies it
    pub fn delay_creates(&self, delay: StdDuration) {
        self.lock().create_delay = delay;
    }

    /// `list_orders` never returns while set
    pub fn hang(&self, hang: bool) {
        self.lock().hang = hang;
    }

    pub fn orders(&self) -> Vec<Order> {
        self.lock().orders.clone()
    }

    pub fn order(&self, id: &str) -> Option<Order> {
        self.lock().orders.iter().find(|o| o.id == id).cloned()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Calls other than reads
    pub fn writes(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, Call::List(_) | Call::Kitchen | Call::Tables))
            .collect()
    }

    pub fn create_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Create(_)))
            .count()
    }

    pub fn active_kitchen_orders(&self) -> Vec<Order> {
        self.lock()
            .orders
            .iter()
            .filter(|o| is_kitchen_active(o.status))
            .cloned()
            .collect()
    }
}

impl State {
    fn build(&mut self, table_id: &str, order_type: OrderType, items: &[OrderItemInput]) -> Order {
        let id = format!("o-{}", self.next_id);
        self.next_id += 1;
        let created_at = self.clock;
        self.clock += Duration::minutes(1);

        let items = items
            .iter()
            .map(|input| {
                let (name, price) = self
                    .menu
                    .get(&input.item_id)
                    .cloned()
                    .unwrap_or_else(|| (input.item_id.clone(), 0.0));
                OrderItem {
                    menu_item_id: input.item_id.clone(),
                    name,
                    quantity: input.quantity,
                    unit_price: price,
                    spice_level: input.spice_level.clone(),
                    customizations: input
                        .customizations
                        .iter()
                        .flatten()
                        .map(|cid| Customization {
                            id: cid.clone(),
                            name: self.customizations.get(cid).cloned().unwrap_or_default(),
                            price_modifier: 0.0,
                        })
                        .collect(),
                    special_instructions: input.special_instructions.clone(),
                }
            })
            .collect();

        Order {
            id,
            table_id: table_id.to_string(),
            order_type,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            created_at,
            items,
            customer_name: Some("Guest".into()),
            customer_phone: None,
            restaurant_id: Some("r-1".into()),
            total_amount: None,
        }
    }
}

fn is_kitchen_active(status: OrderStatus) -> bool {
    matches!(
        status,
        OrderStatus::Pending | OrderStatus::Confirmed | OrderStatus::Preparing | OrderStatus::Ready
    )
}

fn not_found(order_id: &str) -> ClientError {
    ClientError::NotFound(format!("order {}", order_id))
}

#[async_trait]
impl OrderApi for FakeBackend {
    async fn list_orders(&self, query: &OrderQuery) -> ClientResult<Vec<Order>> {
        let hang = {
            let mut state = self.lock();
            state.calls.push(Call::List(query.clone()));
            state.hang
        };
        if hang {
            std::future::pending::<()>().await;
        }

        let state = self.lock();
        Ok(state
            .orders
            .iter()
            .filter(|o| query.table_id.as_ref().is_none_or(|t| &o.table_id == t))
            .filter(|o| query.statuses.is_empty() || query.statuses.contains(&o.status))
            .cloned()
            .collect())
    }

    async fn create_order(&self, request: &CreateOrderRequest) -> ClientResult<Order> {
        let delay = {
            let mut state = self.lock();
            state.calls.push(Call::Create(request.clone()));
            state.create_delay
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.lock();
        if state.fail_next_creates > 0 {
            state.fail_next_creates -= 1;
            return Err(ClientError::Api {
                code: shared::error::ErrorCode::InternalError,
                message: "503 Service Unavailable".into(),
            });
        }
        let order = state.build(&request.table_id, request.order_type, &request.items);
        state.orders.push(order.clone());
        Ok(order)
    }

    async fn cancel_order(&self, order_id: &str) -> ClientResult<()> {
        let mut state = self.lock();
        state.calls.push(Call::Cancel(order_id.to_string()));
        let order = state
            .orders
            .iter_mut()
            .find(|o| o.id == order_id)
            .ok_or_else(|| not_found(order_id))?;
        order.status = OrderStatus::Cancelled;
        Ok(())
    }

    async fn update_status(&self, order_id: &str, status: OrderStatus) -> ClientResult<()> {
        let mut state = self.lock();
        state.calls.push(Call::Status(order_id.to_string(), status));
        let order = state
            .orders
            .iter_mut()
            .find(|o| o.id == order_id)
            .ok_or_else(|| not_found(order_id))?;
        order.status = status;
        Ok(())
    }

    async fn update_payment(&self, order_id: &str, status: PaymentStatus) -> ClientResult<()> {
        let mut state = self.lock();
        state.calls.push(Call::Payment(order_id.to_string(), status));
        let order = state
            .orders
            .iter_mut()
            .find(|o| o.id == order_id)
            .ok_or_else(|| not_found(order_id))?;
        order.payment_status = status;
        Ok(())
    }

    async fn kitchen_active(&self) -> ClientResult<Vec<Order>> {
        self.lock().calls.push(Call::Kitchen);
        Ok(self.active_kitchen_orders())
    }

    async fn list_tables(&self) -> ClientResult<Vec<DiningTable>> {
        let mut state = self.lock();
        state.calls.push(Call::Tables);
        Ok(state.tables.clone())
    }
}

pub fn line(item_id: &str, quantity: u32) -> OrderItemInput {
    OrderItemInput {
        item_id: item_id.into(),
        quantity,
        spice_level: None,
        customizations: None,
        special_instructions: None,
    }
}

pub fn line_with(
    item_id: &str,
    quantity: u32,
    spice: Option<&str>,
    customizations: &[&str],
) -> OrderItemInput {
    OrderItemInput {
        spice_level: spice.map(str::to_string),
        customizations: if customizations.is_empty() {
            None
        } else {
            Some(customizations.iter().map(|c| c.to_string()).collect())
        },
        ..line(item_id, quantity)
    }
}

pub fn config() -> ClientConfig {
    ClientConfig::new("http://127.0.0.1:1")
        .with_restaurant("r-1")
        .with_customer("Guest", "555-0100")
}
