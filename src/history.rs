use std::collections::VecDeque;

pub const MAX_STACK_SIZE: usize = 10;

/// Bounded history of visited view commands. Access is LIFO; once the stack
/// holds [`MAX_STACK_SIZE`] entries a push evicts exactly the oldest one.
#[derive(Debug, Clone, Default)]
pub struct CommandStack {
    stack: VecDeque<String>,
}

impl CommandStack {
    pub fn new() -> Self {
        Self {
            stack: VecDeque::with_capacity(MAX_STACK_SIZE),
        }
    }

    pub fn push(&mut self, command: impl Into<String>) {
        if self.stack.len() == MAX_STACK_SIZE {
            self.stack.pop_front();
        }
        self.stack.push_back(command.into());
    }

    pub fn pop(&mut self) -> Option<String> {
        self.stack.pop_back()
    }

    pub fn top(&self) -> Option<&str> {
        self.stack.back().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// True when only the current view remains, i.e. there is nothing to go
    /// back to.
    pub fn is_last(&self) -> bool {
        self.stack.len() == 1
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }
}

#[cfg(test)]
mod tests {
    use super::{CommandStack, MAX_STACK_SIZE};

    #[test]
    fn pops_in_reverse_push_order() {
        let mut stack = CommandStack::new();
        let commands = ["pods", "svc", "deploy", "ns"];
        for command in commands {
            stack.push(command);
        }

        for command in commands.iter().rev() {
            assert_eq!(stack.pop().as_deref(), Some(*command));
        }
        assert!(stack.is_empty());
        assert_eq!(stack.pop(), None);
    }

    #[test]
    fn empty_and_last_track_remaining_entries() {
        let mut stack = CommandStack::new();
        assert!(stack.is_empty());
        assert!(!stack.is_last());
        assert_eq!(stack.top(), None);

        stack.push("pods");
        assert!(!stack.is_empty());
        assert!(stack.is_last());

        stack.push("svc");
        assert!(!stack.is_last());
        assert_eq!(stack.top(), Some("svc"));
        assert_eq!(stack.len(), 2);

        assert_eq!(stack.pop().as_deref(), Some("svc"));
        assert!(stack.is_last());
        assert_eq!(stack.pop().as_deref(), Some("pods"));
        assert!(stack.is_empty());
    }

    #[test]
    fn top_does_not_remove() {
        let mut stack = CommandStack::new();
        stack.push("pods");
        assert_eq!(stack.top(), Some("pods"));
        assert_eq!(stack.top(), Some("pods"));
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn full_stack_evicts_only_the_oldest_entry() {
        let mut stack = CommandStack::new();
        for index in 0..MAX_STACK_SIZE {
            stack.push(format!("cmd{index}"));
        }
        assert_eq!(stack.len(), MAX_STACK_SIZE);

        stack.push("cmd10");
        assert_eq!(stack.len(), MAX_STACK_SIZE);

        let mut drained = Vec::new();
        while let Some(command) = stack.pop() {
            drained.push(command);
        }
        let expected = (1..=10).rev().map(|i| format!("cmd{i}")).collect::<Vec<_>>();
        assert_eq!(drained, expected);
    }
}
