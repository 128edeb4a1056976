use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: Uuid,
    pub branch_id: Uuid,
    pub category: String,
    pub name: String,
    pub description: Option<String>,
    pub current_stock: i64,
    pub min_quantity: i64,
    pub unit: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewInventoryItem {
    pub branch_id: Uuid,
    pub category: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub current_stock: i64,
    #[serde(default)]
    pub min_quantity: i64,
    pub unit: Option<String>,
}

impl InventoryItem {
    pub fn new(input: NewInventoryItem) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            branch_id: input.branch_id,
            category: input.category,
            name: input.name,
            description: input.description,
            current_stock: input.current_stock,
            min_quantity: input.min_quantity,
            unit: input.unit,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_low_stock(&self) -> bool {
        self.current_stock < self.min_quantity
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseEntry {
    pub id: Uuid,
    pub branch_id: Uuid,
    pub item_id: Uuid,
    pub quantity: i64,
    pub supplier_name: Option<String>,
    pub invoice_number: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPurchaseEntry {
    pub quantity: i64,
    pub supplier_name: Option<String>,
    pub invoice_number: Option<String>,
    pub purchase_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl PurchaseEntry {
    pub fn new(input: NewPurchaseEntry, branch_id: Uuid, item_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            branch_id,
            item_id,
            quantity: input.quantity,
            supplier_name: input.supplier_name,
            invoice_number: input.invoice_number,
            purchase_date: input.purchase_date,
            notes: input.notes,
            created_at: Utc::now(),
        }
    }
}
