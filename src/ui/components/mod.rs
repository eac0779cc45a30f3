mod add_todo;
mod input;
mod key_result;
mod prompt;

pub use add_todo::{AddTodoEvent, AddTodoForm};
pub use key_result::KeyResult;
pub use prompt::{Prompt, PromptEvent};
