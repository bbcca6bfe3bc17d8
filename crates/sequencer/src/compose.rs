//! Message composition for a single step.

use promptseq_core::memory::MemoryLog;
use promptseq_core::message::Message;
use promptseq_core::prompt::PromptSpec;

/// Build the exact message list sent for `steps[index]`.
///
/// Order is fixed:
/// 1. the global context as a `system` message, when non-empty
/// 2. the whole memory log, when `step.use_memory`
/// 3. the previous step's own prompt (not its reply), when `step.predecessor` and `index > 0`
/// 4. the step itself
///
/// Nothing is deduplicated, and neither `memory` nor `steps` is touched.
pub fn compose(
    step: &PromptSpec,
    index: usize,
    steps: &[PromptSpec],
    memory: &MemoryLog,
    global_context: &str,
) -> Vec<Message> {
    let mut messages = Vec::with_capacity(memory.len() + 3);

    if !global_context.is_empty() {
        messages.push(Message::system(global_context));
    }

    if step.use_memory {
        messages.extend(memory.iter().cloned());
    }

    if step.predecessor && index > 0 {
        if let Some(previous) = steps.get(index - 1) {
            messages.push(Message::new(previous.role, previous.content.clone()));
        }
    }

    messages.push(Message::new(step.role, step.content.clone()));
    messages
}
