mod todo_card;
mod todo_list;

pub use todo_list::TodoListView;
