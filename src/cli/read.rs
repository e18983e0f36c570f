//! The `read` command: one-shot introspection dump.

use anyhow::Result;
use owo_colors::OwoColorize;

use crate::app::{Definition, DefinitionElement};
use crate::config::DevConfig;
use crate::introspect::introspect;

pub fn run(config: DevConfig) -> Result<()> {
    match introspect(&config.interpreter, &config.module_path, &config.class_name) {
        Ok(def) => {
            print_definition(&def);
            Ok(())
        }
        Err(err) => {
            crate::log!("error"; "{}", err);
            let detail = err.detail();
            if !detail.is_empty() {
                eprintln!("{detail}");
            }
            anyhow::bail!("introspection failed");
        }
    }
}

fn print_definition(def: &Definition) {
    match def.title.as_deref() {
        Some(title) => println!("{} {}", def.name.bold(), format!("({title})").dimmed()),
        None => println!("{}", def.name.bold()),
    }
    for element in &def.elements {
        print_element(element, 1);
    }
}

fn print_element(element: &DefinitionElement, depth: usize) {
    let indent = "  ".repeat(depth);
    let mut line = format!(
        "{indent}{} {}",
        element.name.cyan(),
        format!("[{}]", element.kind).dimmed()
    );
    if element.label != element.name {
        line.push_str(&format!(" {}", element.label));
    }
    if let Some(default) = &element.default {
        line.push_str(&format!(" {} {}", "=".dimmed(), default));
    }
    println!("{line}");

    for child in &element.children {
        print_element(child, depth + 1);
    }
}
