//! Canned task prompts offered when starting a new run.

/// A named starting point for a task description.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskTemplate {
    /// Display name
    pub name: &'static str,
    /// Prompt text with `[placeholders]` to fill in; empty for a custom task
    pub prompt: &'static str,
}

const TEMPLATES: &[TaskTemplate] = &[
    TaskTemplate { name: "Custom Task", prompt: "" },
    TaskTemplate {
        name: "Web Research",
        prompt: "Search and summarize information about [topic]",
    },
    TaskTemplate {
        name: "Code Analysis",
        prompt: "Analyze the code in [repository/file] and provide insights",
    },
    TaskTemplate {
        name: "Data Processing",
        prompt: "Process the data in [file] and generate a report",
    },
    TaskTemplate {
        name: "System Command",
        prompt: "Execute and explain the results of [command]",
    },
    TaskTemplate {
        name: "Content Creation",
        prompt: "Generate a [type] for [purpose]",
    },
    TaskTemplate {
        name: "SEO Optimization",
        prompt: "Improve the SEO for [website/page]",
    },
    TaskTemplate {
        name: "Market Analysis",
        prompt: "Analyze market trends for [industry/product/company]",
    },
    TaskTemplate {
        name: "Customer Feedback",
        prompt: "Summarize and categorize customer feedback from [source]",
    },
    TaskTemplate {
        name: "Financial Analysis",
        prompt: "Perform a financial analysis on [company/stock]",
    },
];

impl TaskTemplate {
    /// All built-in templates, custom task first.
    pub fn all() -> &'static [TaskTemplate] {
        TEMPLATES
    }

    /// Look a template up by name, ignoring case.
    ///
    /// # Examples
    ///
    /// ```
    /// use ensemble_core::TaskTemplate;
    ///
    /// let t = TaskTemplate::find("web research").unwrap();
    /// assert!(t.prompt.contains("[topic]"));
    /// assert!(TaskTemplate::find("nope").is_none());
    /// ```
    pub fn find(name: &str) -> Option<&'static TaskTemplate> {
        TEMPLATES.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Fill the template with user text.
    ///
    /// The first `[...]` placeholder is replaced; a template with no
    /// placeholder (the custom task) yields the text unchanged.
    pub fn fill(&self, text: &str) -> String {
        match (self.prompt.find('['), self.prompt.find(']')) {
            (Some(start), Some(end)) if start < end => {
                format!("{}{}{}", &self.prompt[..start], text, &self.prompt[end + 1..])
            }
            _ if self.prompt.is_empty() => text.to_string(),
            _ => format!("{} {}", self.prompt, text),
        }
    }
}
