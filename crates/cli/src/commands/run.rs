//! `promptseq run`: Execute a prompt sequence from a file.

use std::path::Path;

use promptseq_config::AppConfig;
use promptseq_core::prompt::{PromptOverrides, RawPromptSpec};
use promptseq_sequencer::{ExecuteRequest, ExecuteResponse, csv, execute_request};
use serde_json::Value;
use tracing::warn;

use crate::RunArgs;

pub async fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let request = build_request(&args)?;

    if !config.has_api_key() {
        warn!("No API key configured (set PROMPTSEQ_API_KEY or OPENAI_API_KEY)");
    }

    let router = promptseq_providers::router::build_from_config(&config);
    let provider = router.default().ok_or("No default provider configured")?;

    let response = execute_request(provider, request, &config.prompt_defaults()).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        print_results(&response);
    }

    Ok(())
}

/// Read the prompt file and apply every command-line adjustment.
fn build_request(args: &RunArgs) -> Result<ExecuteRequest, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(&args.file)
        .map_err(|e| format!("Failed to read {}: {e}", args.file.display()))?;
    let mut request = parse_prompt_file(&args.file, &text)?;

    if let Some(context) = &args.context {
        request.global_context = Some(context.clone());
    } else if let Some(path) = &args.context_file {
        let context = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
        request.global_context = Some(context);
    }

    request.apply_overrides(&PromptOverrides {
        role: args.role,
        model: args.model.clone(),
        max_tokens: args.max_tokens,
        temperature: args.temperature,
        use_memory: args.use_memory,
        predecessor: args.predecessor,
    });

    if let Some(step) = args.step {
        request.prompts = select_step(request.prompts, step)?;
    }

    Ok(request)
}

/// `.csv` files go through the CSV codec; anything else is JSON, either a
/// bare array of prompts or a full request object.
fn parse_prompt_file(path: &Path, text: &str) -> Result<ExecuteRequest, Box<dyn std::error::Error>> {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));

    if is_csv {
        return Ok(ExecuteRequest::new(csv::parse_csv(text)?));
    }

    let value: Value = serde_json::from_str(text)?;
    let value = if value.is_array() {
        serde_json::json!({ "prompts": value })
    } else {
        value
    };
    Ok(ExecuteRequest::from_value(value)?)
}

fn select_step(
    mut prompts: Vec<RawPromptSpec>,
    step: usize,
) -> Result<Vec<RawPromptSpec>, Box<dyn std::error::Error>> {
    if step == 0 || step > prompts.len() {
        return Err(format!("Step {step} is out of range (1-{})", prompts.len()).into());
    }
    Ok(vec![prompts.swap_remove(step - 1)])
}

fn print_results(response: &ExecuteResponse) {
    for result in &response.results {
        println!("── Step {} [{}] ──", result.sequence_number, result.status);
        println!("{}\n", result.content);
    }
    println!(
        "{} step(s), {} memory entries",
        response.results.len(),
        response.memory_log.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptseq_core::message::Role;
    use std::io::Write;

    fn write_file(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn args_for(file: &tempfile::NamedTempFile) -> RunArgs {
        RunArgs {
            file: file.path().to_path_buf(),
            ..RunArgs::default()
        }
    }

    #[test]
    fn csv_file_is_parsed() {
        let file = write_file(
            ".CSV",
            "Role,Model,Max Tokens,Temperature,useMemory,predecessor,content\n\
             user,gpt-4,,1,false,false,\"Hello\"\n",
        );
        let request = build_request(&args_for(&file)).unwrap();
        assert_eq!(request.prompts.len(), 1);
        assert_eq!(request.prompts[0].content.as_deref(), Some("Hello"));
    }

    #[test]
    fn json_array_and_object_are_accepted() {
        let array = write_file(".json", r#"[{"content": "a"}, {"content": "b"}]"#);
        assert_eq!(build_request(&args_for(&array)).unwrap().prompts.len(), 2);

        let object = write_file(
            ".json",
            r#"{"prompts": [{"content": "a"}], "globalContext": "ctx"}"#,
        );
        let request = build_request(&args_for(&object)).unwrap();
        assert_eq!(request.global_context.as_deref(), Some("ctx"));
    }

    #[test]
    fn json_without_prompts_is_rejected() {
        let file = write_file(".json", r#"{"prompts": 3}"#);
        let err = build_request(&args_for(&file)).unwrap_err();
        assert!(err.to_string().contains("Invalid prompts data"));
    }

    #[test]
    fn context_flag_replaces_file_context() {
        let file = write_file(".json", r#"{"prompts": [], "globalContext": "old"}"#);
        let args = RunArgs {
            context: Some("new".into()),
            ..args_for(&file)
        };
        assert_eq!(build_request(&args).unwrap().global_context.as_deref(), Some("new"));
    }

    #[test]
    fn context_file_is_read() {
        let prompts = write_file(".json", "[]");
        let context = write_file(".txt", "From a file.");
        let args = RunArgs {
            context_file: Some(context.path().to_path_buf()),
            ..args_for(&prompts)
        };
        assert_eq!(
            build_request(&args).unwrap().global_context.as_deref(),
            Some("From a file.")
        );
    }

    #[test]
    fn overrides_apply_to_every_prompt() {
        let file = write_file(".json", r#"[{"content": "a"}, {"content": "b", "model": "x"}]"#);
        let args = RunArgs {
            model: Some("gpt-4".into()),
            role: Some(Role::System),
            use_memory: Some(true),
            ..args_for(&file)
        };

        let request = build_request(&args).unwrap();
        for raw in request.prompts {
            let spec = raw.normalize().unwrap();
            assert_eq!(spec.model, "gpt-4");
            assert_eq!(spec.role, Role::System);
            assert!(spec.use_memory);
        }
    }

    #[test]
    fn step_selects_a_single_prompt() {
        let file = write_file(".json", r#"[{"content": "a"}, {"content": "b"}, {"content": "c"}]"#);
        let args = RunArgs {
            step: Some(2),
            ..args_for(&file)
        };
        let request = build_request(&args).unwrap();
        assert_eq!(request.prompts.len(), 1);
        assert_eq!(request.prompts[0].content.as_deref(), Some("b"));
    }

    #[test]
    fn step_out_of_range_is_an_error() {
        let file = write_file(".json", r#"[{"content": "a"}]"#);
        for step in [0, 2] {
            let args = RunArgs {
                step: Some(step),
                ..args_for(&file)
            };
            assert!(build_request(&args).is_err());
        }
    }
}
