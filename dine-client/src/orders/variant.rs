//! Variant identity of a line item
//!
//! Two lines are the same variant when they share the menu item, the spice
//! level and the same *set* of customization names. Selection order of the
//! customizations does not matter.

use serde::{Deserialize, Serialize};
use shared::models::OrderItem;
use std::fmt;

/// 变体键: 菜品 + 辣度 + 排序后的定制项名称
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VariantKey {
    pub menu_item_id: String,
    /// Empty when the line has no spice level
    pub spice_level: String,
    /// Sorted, so the key is order independent
    pub customizations: Vec<String>,
}

impl VariantKey {
    pub fn new(
        menu_item_id: impl Into<String>,
        spice_level: Option<&str>,
        customizations: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let mut customizations: Vec<String> = customizations.into_iter().map(Into::into).collect();
        customizations.sort();
        Self {
            menu_item_id: menu_item_id.into(),
            spice_level: spice_level.unwrap_or_default().to_string(),
            customizations,
        }
    }

    pub fn of(item: &OrderItem) -> Self {
        Self::new(
            item.menu_item_id.as_str(),
            item.spice_level.as_deref(),
            item.customizations.iter().map(|c| c.name.as_str()),
        )
    }

    pub fn matches(&self, item: &OrderItem) -> bool {
        *self == Self::of(item)
    }

    /// Comma-joined sorted customization names
    pub fn customization_label(&self) -> String {
        self.customizations.join(",")
    }
}

impl fmt::Display for VariantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}",
            self.menu_item_id,
            self.spice_level,
            self.customization_label()
        )
    }
}
