use crate::marker::DisplayMode;
use crate::registry::{MarkerGroup, RecordRef};
use crate::resume::{Language, ResumeData};

#[derive(Debug, Clone, PartialEq)]
pub struct TooltipEntry {
    pub title: String,
    pub subtitle: String,
    pub period: String,
}

/// Tooltip content for one marker in one display mode.
#[derive(Debug, Clone, PartialEq)]
pub struct Tooltip {
    pub heading: String,
    pub mode: DisplayMode,
    pub entries: Vec<TooltipEntry>,
    /// Present only when clicking the marker would switch to the other mode.
    pub hint: Option<String>,
}

pub fn legend_label(mode: DisplayMode, lang: Language) -> &'static str {
    match (mode, lang) {
        (DisplayMode::Employment, Language::En) => "Employment",
        (DisplayMode::Employment, Language::No) => "Arbeidsforhold",
        (DisplayMode::Employment, Language::Zh) => "工作经历",
        (DisplayMode::Project, Language::En) => "Projects",
        (DisplayMode::Project, Language::No) => "Prosjekter",
        (DisplayMode::Project, Language::Zh) => "项目",
    }
}

fn switch_hint(target: DisplayMode, lang: Language) -> &'static str {
    match (target, lang) {
        (DisplayMode::Project, Language::En) => "Click to show projects here",
        (DisplayMode::Project, Language::No) => "Klikk for å vise prosjekter her",
        (DisplayMode::Project, Language::Zh) => "点击查看此处的项目",
        (DisplayMode::Employment, Language::En) => "Click to return to employment",
        (DisplayMode::Employment, Language::No) => "Klikk for å gå tilbake til arbeidsforhold",
        (DisplayMode::Employment, Language::Zh) => "点击返回工作经历",
    }
}

pub fn legend_toggle_note(lang: Language) -> &'static str {
    match lang {
        Language::En => "Click a marker with both kinds to switch view",
        Language::No => "Klikk på en markør med begge typer for å bytte visning",
        Language::Zh => "点击同时包含两类的标记以切换视图",
    }
}

impl Tooltip {
    pub fn build(
        group: &MarkerGroup,
        mode: DisplayMode,
        resume: &ResumeData,
        lang: Language,
    ) -> Self {
        let entries = match mode {
            DisplayMode::Employment => group
                .employment_records
                .iter()
                .filter_map(|record| match record.payload {
                    RecordRef::Job(index) => resume.job(index),
                    RecordRef::Project(_) => None,
                })
                .map(|job| TooltipEntry {
                    title: job.company.clone(),
                    subtitle: job.role.get(lang).to_string(),
                    period: job.period_years(lang),
                })
                .collect(),
            DisplayMode::Project => group
                .project_records
                .iter()
                .filter_map(|record| match record.payload {
                    RecordRef::Project(index) => resume.project(index),
                    RecordRef::Job(_) => None,
                })
                .map(|project| TooltipEntry {
                    title: project.name.clone(),
                    subtitle: project.description.get(lang).to_string(),
                    period: project.year.clone(),
                })
                .collect(),
        };

        let other_kind_present = match mode {
            DisplayMode::Employment => group.has_projects(),
            DisplayMode::Project => group.has_employment(),
        };

        Self {
            heading: legend_label(mode, lang).to_string(),
            mode,
            entries,
            hint: other_kind_present.then(|| switch_hint(mode.toggled(), lang).to_string()),
        }
    }

    /// Pango markup for the map popover.
    pub fn to_markup(&self) -> String {
        let mut markup = format!("<b>{}</b>", escape_markup(&self.heading));
        for entry in &self.entries {
            markup.push_str(&format!(
                "\n\n<b>{}</b>\n<small>{}</small>\n<small>{}</small>",
                escape_markup(&entry.title),
                escape_markup(&entry.subtitle),
                escape_markup(&entry.period),
            ));
        }
        if let Some(hint) = &self.hint {
            markup.push_str(&format!("\n\n<i><small>{}</small></i>", escape_markup(hint)));
        }
        markup
    }
}

pub fn escape_markup(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
