mod chat_view;
mod experience_view;
mod map_view;
mod shell;
mod style;

use std::rc::Rc;

use anyhow::Context;
use gtk::prelude::*;
use gtk::{glib, Application, Orientation, ScrolledWindow};
use libadwaita::{prelude::*, ApplicationWindow, ColorScheme, HeaderBar, StyleManager, ToolbarView};
use tracing::{error, info, warn};

use footprint::assistant::AssistantSession;
use footprint::bus::EventBus;
use footprint::config::Config;
use footprint::gemini::GeminiClient;
use footprint::logging;
use footprint::resume::{Language, ResumeData};

use crate::chat_view::create_chat_view;
use crate::experience_view::create_experience_view;
use crate::map_view::MapSection;

const APP_ID: &str = "io.github.footprint.Footprint";

fn main() -> glib::ExitCode {
    let verbose = std::env::args().any(|arg| arg == "-v" || arg == "--verbose");
    logging::init(verbose);

    // reqwest and tokio timers run from glib futures on the main thread
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(err) => {
            error!("Failed to start the async runtime: {}", err);
            return glib::ExitCode::FAILURE;
        }
    };
    let _guard = rt.enter();

    let config = Config::load().unwrap_or_else(|err| {
        warn!("{}; using default settings", err);
        Config::default()
    });
    let resume = match load_resume(&config) {
        Ok(resume) => Rc::new(resume),
        Err(err) => {
            error!("{:#}", err);
            return glib::ExitCode::FAILURE;
        }
    };

    let app = Application::builder().application_id(APP_ID).build();
    app.connect_activate(move |app| {
        if let Err(err) = build_ui(app, &config, resume.clone()) {
            error!("Failed to build the window: {:#}", err);
            app.quit();
        }
    });

    let args: Vec<String> = std::env::args()
        .filter(|arg| arg != "-v" && arg != "--verbose")
        .collect();
    let exit_code = app.run_with_args(&args);

    drop(_guard);
    drop(rt);

    exit_code
}

fn load_resume(config: &Config) -> anyhow::Result<ResumeData> {
    match &config.resume_path {
        Some(path) => {
            info!("Loading resume from {}", path.display());
            ResumeData::load(path)
                .with_context(|| format!("failed to load resume {}", path.display()))
        }
        None => ResumeData::bundled().context("bundled resume is invalid"),
    }
}

fn language_picker(current: Language) -> gtk::DropDown {
    let names: Vec<&str> = Language::ALL.iter().map(Language::display_name).collect();
    let picker = gtk::DropDown::from_strings(&names);
    let index = Language::ALL
        .iter()
        .position(|language| *language == current)
        .unwrap_or_default();
    picker.set_selected(index as u32);
    picker.set_tooltip_text(Some("Language"));
    picker
}

fn replace_children(slot: &gtk::Box, child: &impl IsA<gtk::Widget>) {
    while let Some(old) = slot.first_child() {
        slot.remove(&old);
    }
    slot.append(child);
}

fn build_ui(app: &Application, config: &Config, resume: Rc<ResumeData>) -> anyhow::Result<()> {
    StyleManager::default().set_color_scheme(ColorScheme::PreferDark);

    let bus = EventBus::shared();
    let language = config.language;

    let map_section = MapSection::new(&config.map, resume.clone(), language, &bus)?;

    let experience_slot = gtk::Box::builder()
        .orientation(Orientation::Vertical)
        .build();
    experience_slot.append(&create_experience_view(&resume, language, &bus, &config.map));

    let page = gtk::Box::builder()
        .orientation(Orientation::Vertical)
        .spacing(12)
        .margin_top(12)
        .margin_bottom(12)
        .margin_start(12)
        .margin_end(12)
        .build();
    page.append(map_section.widget());
    page.append(&experience_slot);

    let scrolled = ScrolledWindow::builder()
        .hexpand(true)
        .vexpand(true)
        .hscrollbar_policy(gtk::PolicyType::Never)
        .child(&page)
        .build();
    map_section.track_visibility(&scrolled);

    let service = Rc::new(GeminiClient::new(config.assistant.clone(), &resume));
    let session = AssistantSession::new(service, bus.clone());
    let chat = create_chat_view(session, &bus);

    let paned = gtk::Paned::builder()
        .orientation(Orientation::Horizontal)
        .start_child(&scrolled)
        .end_child(&chat)
        .resize_start_child(true)
        .resize_end_child(false)
        .shrink_end_child(false)
        .position(900)
        .build();

    let header_bar = HeaderBar::builder().build();
    header_bar.set_title_widget(Some(&gtk::Label::new(Some(resume.contact.name.as_str()))));

    let picker = language_picker(language);
    {
        let map_section = map_section.clone();
        let experience_slot = experience_slot.clone();
        let resume = resume.clone();
        let bus = bus.clone();
        let map_config = config.map.clone();
        picker.connect_selected_notify(move |picker| {
            let Some(language) = Language::ALL.get(picker.selected() as usize).copied() else {
                return;
            };
            map_section.set_language(language);
            replace_children(
                &experience_slot,
                &create_experience_view(&resume, language, &bus, &map_config),
            );
        });
    }
    header_bar.pack_end(&picker);

    let linkedin = resume.contact.linkedin.clone();
    if !linkedin.is_empty() {
        let button = gtk::Button::builder()
            .icon_name("web-browser-symbolic")
            .tooltip_text("LinkedIn")
            .build();
        button.connect_clicked(move |_| {
            if let Err(err) = open::that(&linkedin) {
                warn!("Failed to open {}: {}", linkedin, err);
            }
        });
        header_bar.pack_start(&button);
    }

    let toolbar_view = ToolbarView::builder().build();
    toolbar_view.add_top_bar(&header_bar);
    toolbar_view.set_content(Some(&paned));

    let window = ApplicationWindow::builder()
        .application(app)
        .title(format!("{} - Portfolio", resume.contact.name))
        .default_width(1280)
        .default_height(800)
        .build();

    let css_provider = gtk::CssProvider::new();
    css_provider.load_from_data(&style::stylesheet());
    gtk::style_context_add_provider_for_display(
        &gtk::prelude::WidgetExt::display(&window),
        &css_provider,
        gtk::STYLE_PROVIDER_PRIORITY_APPLICATION,
    );

    window.set_content(Some(&toolbar_view));
    window.present();
    info!("Window ready with {} employment records", resume.employment_history.len());
    Ok(())
}
