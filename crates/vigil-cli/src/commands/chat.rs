//! `vigil chat`: terminal conversation with human confirmation.
//!
//! The trace lives here, not in the driver. When the loop stops to wait for
//! a decision, the answer is written into the invocation's result slot and
//! the whole trace is sent back, the same way an HTTP client would.

use std::io::Write;

use anyhow::Result;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use vigil_config::Config;
use vigil_core::{Decision, Message, StreamFrame, Trace};
use vigil_orchestrator::{Driver, DriverOutcome, Multiplexer, RequestOptions, system_prompt};
use vigil_tools::OrderMode;

use crate::config_bridge::{build_provider, build_toolset, to_orchestrator_config};
use crate::theme::Theme;

pub(crate) async fn run_chat(cfg: &Config, user_id: Option<String>) -> Result<()> {
    let toolset = build_toolset(cfg)?;
    let mode = OrderMode::Confirmed;
    let driver = Driver::new(
        build_provider(cfg)?,
        toolset.registry(mode),
        to_orchestrator_config(cfg),
    )
    .with_system_prompt(system_prompt(mode));

    println!("{}", Theme::header("Vigil stock advisor"));
    println!(
        "{}",
        Theme::dimmed(&format!("model {} | type exit to quit", cfg.model.model))
    );
    if let Some(user) = &user_id {
        println!("{}", Theme::dimmed(&format!("acting as {user}")));
    }
    println!("{}", Theme::separator());

    let mut trace = Trace::new();
    loop {
        let input: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt("you")
            .allow_empty(true)
            .interact_text()?;
        let input = input.trim();
        if input.is_empty() {
            continue;
        }
        if input == "exit" || input == "quit" {
            println!("{}", Theme::dimmed("Goodbye!"));
            return Ok(());
        }

        trace.push(Message::user(input));
        while let Some(DriverOutcome::AwaitingConfirmation { call_ids, .. }) =
            run_turn(&driver, &mut trace, user_id.as_deref()).await?
        {
            ask_decisions(&mut trace, &call_ids)?;
        }
    }
}

/// One request to the driver. Ctrl-C cancels it.
async fn run_turn(
    driver: &Driver,
    trace: &mut Trace,
    user_id: Option<&str>,
) -> Result<Option<DriverOutcome>> {
    let options = match user_id {
        Some(user) => RequestOptions::new().with_user(user),
        None => RequestOptions::new(),
    };

    let cancel = CancellationToken::new();
    let (mux, rx) = Multiplexer::new(cancel.clone());
    let printer = tokio::spawn(print_frames(rx));
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let result = driver.run(trace, &options, &mux).await;
    interrupt.abort();
    drop(mux);
    printer.await?;

    match result {
        Ok(DriverOutcome::MaxStepsReached { steps }) => {
            println!(
                "{}",
                Theme::warning(&format!("stopped after {steps} steps without an answer"))
            );
            Ok(None)
        },
        Ok(outcome) => Ok(Some(outcome)),
        Err(e) => {
            debug!(error = %e, "turn failed");
            Ok(None)
        },
    }
}

async fn print_frames(mut rx: mpsc::UnboundedReceiver<StreamFrame>) {
    let mut stdout = std::io::stdout();
    let mut mid_line = false;
    while let Some(frame) = rx.recv().await {
        match frame {
            StreamFrame::Text { delta } => {
                print!("{delta}");
                let _ = stdout.flush();
                mid_line = true;
            },
            StreamFrame::ToolCall {
                tool_name,
                arguments,
                ..
            } => {
                if std::mem::take(&mut mid_line) {
                    println!();
                }
                println!("{}", Theme::dimmed(&format!("→ {tool_name} {arguments}")));
            },
            StreamFrame::ToolResult { call_id, payload } => {
                let ok = payload.get("success").and_then(serde_json::Value::as_bool) == Some(true);
                let line = format!("{call_id} finished");
                if ok {
                    println!("{}", Theme::success(&line));
                } else {
                    let reason = payload
                        .get("error")
                        .or_else(|| payload.get("message"))
                        .and_then(serde_json::Value::as_str)
                        .unwrap_or("failed");
                    println!("{}", Theme::warning(&format!("{call_id}: {reason}")));
                }
            },
            StreamFrame::Finish { .. } => {
                if std::mem::take(&mut mid_line) {
                    println!();
                }
            },
            StreamFrame::Error { message } => {
                if std::mem::take(&mut mid_line) {
                    println!();
                }
                eprintln!("{}", Theme::error(&message));
            },
            StreamFrame::Done => {},
        }
    }
}

/// Ask about every pending call and record each answer in its slot.
fn ask_decisions(trace: &mut Trace, call_ids: &[String]) -> Result<()> {
    for call_id in call_ids {
        let Some(inv) = trace.find_invocation_mut(call_id) else {
            continue;
        };
        let args = serde_json::to_string_pretty(&inv.arguments)?;
        println!("{}", Theme::confirmation_box(&inv.tool_name, &args));

        let approved = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Approve {}?", inv.tool_name))
            .default(false)
            .interact()?;
        let decision = if approved {
            Decision::Approve
        } else {
            Decision::Reject
        };
        *inv = inv.clone().with_decision(decision);
    }
    Ok(())
}
