use std::collections::HashMap;

use crate::core::platform::Platform;
use crate::core::version::{rules_allow, Argument, ArgumentValue, Features};

/// Values for `${name}` placeholders in argument templates.
#[derive(Debug, Clone, Default)]
pub struct Placeholders(HashMap<&'static str, String>);

impl Placeholders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &'static str, value: impl Into<String>) -> &mut Self {
        self.0.insert(key, value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    fn apply(&self, template: &str) -> String {
        let mut out = template.to_string();
        for (key, value) in &self.0 {
            out = out.replace(&format!("${{{key}}}"), value);
        }
        out
    }
}

/// Flatten rule-gated argument entries for `platform` and `features`.
pub fn expand(arguments: &[Argument], platform: &Platform, features: &Features) -> Vec<String> {
    let mut out = Vec::new();
    for argument in arguments {
        match argument {
            Argument::Plain(value) => out.push(value.clone()),
            Argument::Conditional { rules, value } => {
                if !rules_allow(rules, platform, features) {
                    continue;
                }
                match value {
                    ArgumentValue::One(v) => out.push(v.clone()),
                    ArgumentValue::Many(vs) => out.extend(vs.iter().cloned()),
                }
            }
        }
    }
    out
}

/// Substitute placeholders. An argument still holding an unknown `${...}` is
/// dropped, together with the flag right before it.
pub fn substitute(templates: &[String], placeholders: &Placeholders) -> Vec<String> {
    let mut resolved = Vec::with_capacity(templates.len());
    for template in templates {
        let value = placeholders.apply(template);
        if value.contains("${") {
            drop_dangling_option(&mut resolved);
            continue;
        }
        resolved.push(value);
    }
    resolved
}

fn drop_dangling_option(args: &mut Vec<String>) {
    if args.last().is_some_and(|last| last.starts_with('-')) {
        let _ = args.pop();
    }
}

/// Remove `--width`/`--height` pairs whose value is not a number.
pub fn sanitize_window_args(args: Vec<String>) -> Vec<String> {
    let mut sanitized = Vec::with_capacity(args.len());
    let mut i = 0;

    while i < args.len() {
        let arg = &args[i];
        if arg == "--width" || arg == "--height" {
            match args.get(i + 1) {
                Some(value) if value.parse::<u32>().is_ok() => {
                    sanitized.push(arg.clone());
                    sanitized.push(value.clone());
                    i += 2;
                }
                _ => i += 1,
            }
            continue;
        }

        sanitized.push(arg.clone());
        i += 1;
    }

    sanitized
}

pub fn contains_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|arg| arg == flag)
}
