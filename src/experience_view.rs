use gtk::prelude::*;
use gtk::{Align, Label, Orientation};

use footprint::bus::{AssistantPromptRequest, BusEvent, EventBus, FocusRequest, HighlightRequest};
use footprint::config::MapConfig;
use footprint::geo::Coordinate;
use footprint::resume::{Job, Language, Project, ResumeData};

#[derive(Clone, Copy)]
enum Heading {
    Experience,
    Projects,
    Skills,
    Languages,
    Ask,
}

fn heading(heading: Heading, lang: Language) -> &'static str {
    match (heading, lang) {
        (Heading::Experience, Language::En) => "Experience",
        (Heading::Experience, Language::No) => "Erfaring",
        (Heading::Experience, Language::Zh) => "工作经历",
        (Heading::Projects, Language::En) => "Projects",
        (Heading::Projects, Language::No) => "Prosjekter",
        (Heading::Projects, Language::Zh) => "项目",
        (Heading::Skills, Language::En) => "Skills",
        (Heading::Skills, Language::No) => "Ferdigheter",
        (Heading::Skills, Language::Zh) => "技能",
        (Heading::Languages, Language::En) => "Languages",
        (Heading::Languages, Language::No) => "Språk",
        (Heading::Languages, Language::Zh) => "语言",
        (Heading::Ask, Language::En) => "Ask the assistant",
        (Heading::Ask, Language::No) => "Spør assistenten",
        (Heading::Ask, Language::Zh) => "询问助手",
    }
}

fn role_prompt(job: &Job, lang: Language) -> String {
    let role = job.role.get(lang);
    match lang {
        Language::En => format!("Tell me about the {} role at {}.", role, job.company),
        Language::No => format!("Fortell meg om rollen som {} hos {}.", role, job.company),
        Language::Zh => format!("请介绍一下在{}担任{}的经历。", job.company, role),
    }
}

fn section_title(text: &str) -> Label {
    let label = Label::builder().label(text).xalign(0.0).margin_top(12).build();
    label.add_css_class("title-3");
    label
}

fn body(text: &str) -> Label {
    Label::builder()
        .label(text)
        .xalign(0.0)
        .wrap(true)
        .selectable(true)
        .build()
}

fn highlight_on_click(button: &gtk::Button, bus: &EventBus, coordinate: Coordinate) {
    let bus = bus.clone();
    button.connect_clicked(move |_| {
        bus.publish(BusEvent::Highlight(HighlightRequest::at(&[coordinate], None)));
    });
}

fn location_chip(label: &str) -> gtk::Button {
    let content = gtk::Box::builder()
        .orientation(Orientation::Horizontal)
        .spacing(4)
        .build();
    content.append(&gtk::Image::from_icon_name("mark-location-symbolic"));
    content.append(&Label::new(Some(label)));

    let chip = gtk::Button::builder()
        .child(&content)
        .halign(Align::Start)
        .build();
    chip.add_css_class("flat");
    chip.add_css_class("location-chip");
    chip
}

fn job_card(job: &Job, lang: Language, bus: &EventBus, config: &MapConfig) -> gtk::Box {
    let card = gtk::Box::builder()
        .orientation(Orientation::Vertical)
        .spacing(4)
        .build();
    card.add_css_class("card");
    card.add_css_class("experience-card");

    let company = gtk::Button::builder()
        .label(&job.company)
        .halign(Align::Start)
        .build();
    company.add_css_class("flat");
    company.add_css_class("experience-company");
    match job.coordinate() {
        Some(coordinate) => highlight_on_click(&company, bus, coordinate),
        None => company.set_sensitive(false),
    }
    card.append(&company);

    let role = Label::builder().label(job.role.get(lang)).xalign(0.0).build();
    role.add_css_class("heading");
    card.append(&role);

    let period = Label::builder()
        .label(job.period_months(lang))
        .xalign(0.0)
        .build();
    period.add_css_class("experience-period");
    card.append(&period);

    if let Some(coordinate) = job.coordinate() {
        let chip = location_chip(&job.location);
        let bus = bus.clone();
        let zoom = config.focus_zoom;
        chip.connect_clicked(move |_| {
            bus.publish(BusEvent::Focus(FocusRequest {
                lat: coordinate.lat,
                lng: coordinate.lng,
                zoom,
            }));
        });
        card.append(&chip);
    }

    if let Some(description) = &job.description {
        card.append(&body(description.get(lang)));
    }

    let ask = gtk::Button::builder()
        .label(heading(Heading::Ask, lang))
        .halign(Align::End)
        .build();
    ask.add_css_class("pill");
    let bus = bus.clone();
    let prompt = role_prompt(job, lang);
    ask.connect_clicked(move |_| {
        bus.publish(BusEvent::AssistantPrompt(AssistantPromptRequest {
            prompt: prompt.clone(),
        }));
    });
    card.append(&ask);

    card
}

fn project_card(project: &Project, lang: Language, bus: &EventBus) -> gtk::Box {
    let card = gtk::Box::builder()
        .orientation(Orientation::Vertical)
        .spacing(4)
        .build();
    card.add_css_class("card");
    card.add_css_class("experience-card");

    let title = Label::builder()
        .label(format!("{} ({})", project.name, project.year))
        .xalign(0.0)
        .wrap(true)
        .build();
    title.add_css_class("heading");
    card.append(&title);
    card.append(&body(project.description.get(lang)));

    if let (Some(coordinate), Some(location)) = (project.coordinate(), &project.location) {
        let chip = location_chip(location);
        highlight_on_click(&chip, bus, coordinate);
        card.append(&chip);
    }

    card
}

/// Contact header, employment and project cards, skills and languages. Every map
/// interaction goes out over `bus`.
pub fn create_experience_view(
    resume: &ResumeData,
    lang: Language,
    bus: &EventBus,
    config: &MapConfig,
) -> gtk::Box {
    let container = gtk::Box::builder()
        .orientation(Orientation::Vertical)
        .spacing(8)
        .margin_top(12)
        .margin_bottom(24)
        .build();

    let name = Label::builder()
        .label(&resume.contact.name)
        .xalign(0.0)
        .build();
    name.add_css_class("title-1");
    container.append(&name);

    let title = Label::builder()
        .label(resume.contact.title.get(lang))
        .xalign(0.0)
        .build();
    title.add_css_class("title-4");
    container.append(&title);

    let details = resume.contact.details_line();
    if !details.is_empty() {
        let details = Label::builder().label(&details).xalign(0.0).selectable(true).build();
        details.add_css_class("dim-label");
        container.append(&details);
    }
    container.append(&body(resume.contact.summary.get(lang)));

    container.append(&section_title(heading(Heading::Experience, lang)));
    for job in &resume.employment_history {
        container.append(&job_card(job, lang, bus, config));
    }

    if !resume.projects.is_empty() {
        container.append(&section_title(heading(Heading::Projects, lang)));
        for project in &resume.projects {
            container.append(&project_card(project, lang, bus));
        }
    }

    if !resume.skills.is_empty() {
        container.append(&section_title(heading(Heading::Skills, lang)));
        container.append(&body(&resume.skills.join(" · ")));
    }

    if !resume.languages.is_empty() {
        container.append(&section_title(heading(Heading::Languages, lang)));
        container.append(&body(&resume.languages.join(" · ")));
    }

    container
}
