//! `vigil orders`: inspect stored orders.

use anyhow::{Context, Result};
use colored::Colorize;
use vigil_config::{Config, StorageBackend};
use vigil_storage::StockOrder;

use crate::config_bridge::build_store;
use crate::theme::Theme;

pub(crate) async fn list_orders(cfg: &Config, user_id: &str) -> Result<()> {
    if cfg.storage.backend == StorageBackend::Memory {
        println!(
            "{}",
            Theme::warning("storage backend is 'memory'; orders from other processes are not visible")
        );
    }

    let store = build_store(cfg)?;
    let orders = store
        .get_by_user(user_id)
        .await
        .with_context(|| format!("failed to read orders for {user_id}"))?;

    if orders.is_empty() {
        println!("{}", Theme::info(&format!("No orders for {user_id}")));
        return Ok(());
    }

    println!("{}", Theme::header(&format!("Orders for {user_id}")));
    println!("{}", Theme::separator());
    for order in &orders {
        println!("{}", format_order(order));
    }
    println!("{}", Theme::dimmed(&format!("{} order(s)", orders.len())));
    Ok(())
}

fn format_order(order: &StockOrder) -> String {
    let side = order.order_type.to_string();
    let side = if side == "BUY" {
        side.as_str().green()
    } else {
        side.as_str().red()
    };
    format!(
        "{}  {:<4} {:>6} {:<6} @ ${:<10} {}",
        order.timestamp.format("%Y-%m-%d %H:%M:%S"),
        side,
        order.quantity,
        order.symbol.as_str().bold(),
        order.price,
        Theme::dimmed(&order.id),
    )
}
