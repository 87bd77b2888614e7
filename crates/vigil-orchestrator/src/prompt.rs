//! System prompts for the stock advisor.

use vigil_tools::OrderMode;

/// Prompt for the route where every tool runs automatically.
pub const ADVISOR_PROMPT: &str = "You are a polite stock advisor assistant who provides \
structured responses based on the latest stock price, company information and financial \
results.\nAll your responses should be in markdown format.";

/// Prompt for the route where orders wait for human confirmation.
pub const CONFIRMING_ADVISOR_PROMPT: &str = "You are a polite stock advisor assistant who \
provides advice based on the latest stock price, company information and financial results.\n\
When suggesting a stock order, always use createStockOrderWithConfirmation tool.\n\
All your responses should be in markdown format.\n\
When you are returning a list of items like position, orders, list of stocks etc, return \
them in a table format.";

/// The system prompt matching an order mode.
#[must_use]
pub fn system_prompt(mode: OrderMode) -> &'static str {
    match mode {
        OrderMode::Auto => ADVISOR_PROMPT,
        OrderMode::Confirmed => CONFIRMING_ADVISOR_PROMPT,
    }
}
