use std::cell::Cell;
use std::rc::Rc;

use gtk::prelude::*;
use gtk::{glib, Align, Label, Orientation, ScrolledWindow};
use tracing::debug;

use footprint::assistant::{AssistantSession, ChatMessage, ChatRole};
use footprint::bus::{BusEvent, EventBus, Topic};

fn append_bubble(list: &gtk::Box, message: &ChatMessage) {
    let bubble = Label::builder()
        .label(&message.text)
        .wrap(true)
        .selectable(true)
        .xalign(0.0)
        .max_width_chars(48)
        .build();
    bubble.add_css_class("chat-bubble");

    let (align, class) = match (message.role, message.is_error) {
        (ChatRole::User, _) => (Align::End, "chat-user"),
        (ChatRole::Model, false) => (Align::Start, "chat-model"),
        (ChatRole::Model, true) => (Align::Start, "chat-error"),
    };
    bubble.set_halign(align);
    bubble.add_css_class(class);
    list.append(&bubble);
}

fn scroll_to_end(scrolled: &ScrolledWindow) {
    let adjustment = scrolled.vadjustment();
    glib::idle_add_local_once(move || {
        adjustment.set_value(adjustment.upper() - adjustment.page_size());
    });
}

/// Assistant panel. Prompts come from the entry or from `assistant-prompt-request`
/// events; replies are rendered without their location directive.
pub fn create_chat_view(session: Rc<AssistantSession>, bus: &EventBus) -> gtk::Box {
    let container = gtk::Box::builder()
        .orientation(Orientation::Vertical)
        .spacing(8)
        .width_request(340)
        .build();

    let title = Label::builder()
        .label("Assistant")
        .xalign(0.0)
        .margin_top(12)
        .margin_start(12)
        .build();
    title.add_css_class("title-4");
    container.append(&title);

    let messages = gtk::Box::builder()
        .orientation(Orientation::Vertical)
        .spacing(8)
        .margin_start(12)
        .margin_end(12)
        .build();
    for message in session.transcript() {
        append_bubble(&messages, &message);
    }

    let scrolled = ScrolledWindow::builder()
        .vexpand(true)
        .hscrollbar_policy(gtk::PolicyType::Never)
        .child(&messages)
        .build();
    container.append(&scrolled);

    let input_row = gtk::Box::builder()
        .orientation(Orientation::Horizontal)
        .spacing(6)
        .margin_start(12)
        .margin_end(12)
        .margin_bottom(12)
        .build();
    let entry = gtk::Entry::builder()
        .placeholder_text("Ask about experience, projects or skills...")
        .hexpand(true)
        .build();
    let spinner = gtk::Spinner::new();
    let send = gtk::Button::builder()
        .icon_name("mail-send-symbolic")
        .tooltip_text("Send")
        .build();
    send.add_css_class("suggested-action");
    input_row.append(&entry);
    input_row.append(&spinner);
    input_row.append(&send);
    container.append(&input_row);

    let submit: Rc<dyn Fn(&str) -> bool> = {
        let entry = entry.clone();
        let send = send.clone();
        Rc::new(move |text: &str| {
            let turn = match session.begin(text) {
                Ok(turn) => turn,
                Err(err) => {
                    debug!("Prompt not sent: {}", err);
                    return false;
                }
            };
            append_bubble(&messages, &ChatMessage::user(turn.prompt()));
            scroll_to_end(&scrolled);

            entry.set_sensitive(false);
            send.set_sensitive(false);
            spinner.start();

            let messages = messages.clone();
            let scrolled = scrolled.clone();
            let entry = entry.clone();
            let send = send.clone();
            let spinner = spinner.clone();
            glib::spawn_future_local(async move {
                let reply = turn.complete().await;
                append_bubble(&messages, &reply);
                scroll_to_end(&scrolled);
                spinner.stop();
                entry.set_sensitive(true);
                send.set_sensitive(true);
                entry.grab_focus();
            });
            true
        })
    };

    let submit_entry = {
        let submit = submit.clone();
        let entry = entry.clone();
        move || {
            if submit(entry.text().as_str()) {
                entry.set_text("");
            }
        }
    };
    let on_activate = submit_entry.clone();
    entry.connect_activate(move |_| on_activate());
    send.connect_clicked(move |_| submit_entry());

    let subscription = bus.subscribe(Topic::AssistantPromptRequest, move |event| {
        if let BusEvent::AssistantPrompt(request) = event {
            submit(&request.prompt);
        }
        Ok(())
    });
    let subscription = Cell::new(Some(subscription));
    container.connect_destroy(move |_| {
        if let Some(subscription) = subscription.take() {
            subscription.unsubscribe();
        }
    });

    container
}
