// Copyright (c) 2025 Felix Kahle.
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the
// "Software"), to deal in the Software without restriction, including
// without limitation the rights to use, copy, modify, merge, publish,
// distribute, sublicense, and/or sell copies of the Software, and to
// permit persons to whom the Software is furnished to do so, subject to
// the following conditions:
//
// The above copyright notice and this permission notice shall be
// included in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND,
// EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF
// MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND
// NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE
// LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION
// OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION
// WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

use crate::{
    assignment::Assignment,
    model::CpModel,
    monitor::search_monitor::{SearchCommand, SearchMonitor},
};

/// Forwards every event to a list of monitors.
pub struct CompositeMonitor<'a> {
    monitors: Vec<Box<dyn SearchMonitor + 'a>>,
}

impl std::fmt::Debug for CompositeMonitor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names = self
            .monitors
            .iter()
            .map(|m| m.name())
            .collect::<Vec<&str>>()
            .join(", ");
        f.debug_struct("CompositeMonitor")
            .field("monitors", &names)
            .finish()
    }
}

impl Default for CompositeMonitor<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> CompositeMonitor<'a> {
    #[inline]
    pub fn new() -> Self {
        Self {
            monitors: Vec::new(),
        }
    }

    #[inline]
    pub fn add_monitor<M>(&mut self, monitor: M)
    where
        M: SearchMonitor + 'a,
    {
        self.monitors.push(Box::new(monitor));
    }

    #[inline]
    pub fn add_monitor_boxed(&mut self, monitor: Box<dyn SearchMonitor + 'a>) {
        self.monitors.push(monitor);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }
}

impl<'a> FromIterator<Box<dyn SearchMonitor + 'a>> for CompositeMonitor<'a> {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = Box<dyn SearchMonitor + 'a>>,
    {
        Self {
            monitors: iter.into_iter().collect(),
        }
    }
}

impl SearchMonitor for CompositeMonitor<'_> {
    fn name(&self) -> &str {
        "CompositeMonitor"
    }

    fn on_enter_search(&mut self, model: &CpModel) {
        for monitor in &mut self.monitors {
            monitor.on_enter_search(model);
        }
    }

    fn on_exit_search(&mut self) {
        for monitor in &mut self.monitors {
            monitor.on_exit_search();
        }
    }

    fn on_solution_found(&mut self, assignment: &Assignment) {
        for monitor in &mut self.monitors {
            monitor.on_solution_found(assignment);
        }
    }

    fn on_step(&mut self) {
        for monitor in &mut self.monitors {
            monitor.on_step();
        }
    }

    fn search_command(&self) -> SearchCommand {
        // Plain loop: this sits on the hottest path of every worker.
        for monitor in &self.monitors {
            if let SearchCommand::Terminate(reason) = monitor.search_command() {
                return SearchCommand::Terminate(reason);
            }
        }
        SearchCommand::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::interrupt::InterruptMonitor;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct CountingMonitor<'a> {
        steps: &'a std::cell::Cell<u32>,
    }

    impl SearchMonitor for CountingMonitor<'_> {
        fn name(&self) -> &str {
            "CountingMonitor"
        }
        fn on_enter_search(&mut self, _model: &CpModel) {}
        fn on_exit_search(&mut self) {}
        fn on_solution_found(&mut self, _assignment: &Assignment) {}
        fn on_step(&mut self) {
            self.steps.set(self.steps.get() + 1);
        }
        fn search_command(&self) -> SearchCommand {
            SearchCommand::Continue
        }
    }

    #[test]
    fn test_composite_forwards_steps_and_first_terminate_wins() {
        let steps = std::cell::Cell::new(0);
        let flag = AtomicBool::new(false);

        let mut composite = CompositeMonitor::new();
        composite.add_monitor(CountingMonitor { steps: &steps });
        composite.add_monitor(InterruptMonitor::new(&flag));
        assert_eq!(composite.len(), 2);

        composite.on_step();
        composite.on_step();
        assert_eq!(steps.get(), 2);
        assert_eq!(composite.search_command(), SearchCommand::Continue);

        flag.store(true, Ordering::Relaxed);
        assert!(matches!(
            composite.search_command(),
            SearchCommand::Terminate(_)
        ));
    }
}
