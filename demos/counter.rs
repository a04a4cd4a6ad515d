//! Counter Chart
//!
//! This example drives a small chart synchronously with `dispatch`.
//!
//! Key concepts:
//! - Declaring a chart with `nodes!` and the state factories
//! - Guarded eventless transitions over the host's context
//! - Done data returned when a top-level final state is reached
//!
//! Run with: cargo run --example counter

use serde_json::json;
use statecraft::core::Event;
use statecraft::document::{
    done_data, eventless, final_state, initial, state, transition, Datamodel, Document, Invocation,
};
use statecraft::interpreter::{EventSender, Host, HostError, Interpreter, Outbox};
use statecraft::nodes;
use std::sync::Arc;

struct Counter;

impl Datamodel for Counter {
    type Context = u32;
    type Content = &'static str;
    type Source = ();
}

#[derive(Default)]
struct Console {
    count: u32,
    done: Option<serde_json::Value>,
}

impl Host<Counter> for Console {
    fn context(&self) -> &u32 {
        &self.count
    }

    fn execute_content(
        &mut self,
        content: &&'static str,
        event: Option<&Event>,
        _outbox: &mut Outbox,
    ) -> Result<(), HostError> {
        match *content {
            "increment" => self.count += 1,
            other => {
                let trigger = event.map(|e| e.name.as_str()).unwrap_or("<eventless>");
                println!("  [{trigger}] {other}");
            }
        }
        Ok(())
    }

    fn invoke(&mut self, _: &Invocation<Counter>, _: &EventSender) -> Result<(), HostError> {
        Ok(())
    }

    fn cancel_invoke(&mut self, _: &Invocation<Counter>) {}

    fn return_done_event(&mut self, donedata: &serde_json::Value) {
        self.done = Some(donedata.clone());
    }
}

fn main() {
    println!("=== Counter Chart Example ===\n");

    let document = Document::<Counter>::build(nodes![
        initial("idle", nodes![transition(["GO"]).to(["running"]).action("increment")]),
        state(
            "running",
            nodes![
                transition(["GO"]).when(|count: &u32| *count < 3).action("increment"),
                eventless().when(|count: &u32| *count >= 3).to(["done"]).action("limit reached"),
            ]
        ),
        final_state("done", nodes![done_data(json!({ "total": 3 }))]),
    ])
    .unwrap();

    let mut chart = Interpreter::new(Arc::new(document), Console::default()).unwrap();
    chart.settle().unwrap();
    println!("Initial configuration: {:?}", chart.state());

    for _ in 0..3 {
        chart.dispatch(Event::new("GO")).unwrap();
        println!("After GO: {:?} (count = {})", chart.state(), chart.host().count);
    }

    let halted = chart.halt().unwrap();
    println!("\nHalted: {:?}", halted.reason);
    println!("Final configuration: {:?}", halted.configuration);
    println!("Done data: {:?}", halted.host.done);
    println!("Microsteps taken: {}", halted.trace.len());

    println!("\n=== Example Complete ===");
}
