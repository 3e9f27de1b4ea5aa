//! 通知・警告バナー

use gloo::timers::callback::Timeout;
use kaong_common::notify::{Notification, WarningBanner};
use leptos::prelude::*;

/// 画面右上の通知キュー（contextで共有）
#[derive(Clone, Copy)]
pub struct Notifier {
    items: RwSignal<Vec<(u64, Notification)>>,
    warning: RwSignal<Option<(u64, WarningBanner)>>,
    next_id: StoredValue<u64>,
}

impl Notifier {
    pub fn new() -> Self {
        Self {
            items: RwSignal::new(Vec::new()),
            warning: RwSignal::new(None),
            next_id: StoredValue::new(0),
        }
    }

    fn issue_id(&self) -> u64 {
        self.next_id.update_value(|id| *id += 1);
        self.next_id.get_value()
    }

    /// 通知を出す（一定時間で自動的に消える）
    pub fn push(&self, notification: Notification) {
        let id = self.issue_id();
        let duration = notification.duration_ms;
        self.items.update(|items| items.push((id, notification)));

        let items = self.items;
        Timeout::new(duration, move || {
            items.try_update(|items| items.retain(|(i, _)| *i != id));
        })
        .forget();
    }

    /// ネガティブサンプルの警告を出す（前の警告は置き換える）
    pub fn warn(&self, banner: WarningBanner) {
        let id = self.issue_id();
        let duration = banner.duration_ms;
        self.warning.set(Some((id, banner)));

        let warning = self.warning;
        Timeout::new(duration, move || {
            warning.try_update(|w| {
                if w.as_ref().map(|(i, _)| *i) == Some(id) {
                    *w = None;
                }
            });
        })
        .forget();
    }
}

pub fn use_notifier() -> Notifier {
    expect_context::<Notifier>()
}

#[component]
pub fn Notifications() -> impl IntoView {
    let notifier = use_notifier();

    view! {
        <div class="notifications">
            <For
                each=move || notifier.items.get()
                key=|(id, _)| *id
                children=move |(_, notification)| {
                    view! {
                        <div
                            class=notification.css_class()
                            style=format!("background-color: {}", notification.kind.color())
                        >
                            {notification.message.clone()}
                        </div>
                    }
                }
            />
        </div>
        {move || notifier.warning.get().map(|(_, banner)| view! {
            <div class="warning-banner">
                <span class="warning-icon">"⚠️"</span>
                <span>{banner.message}</span>
            </div>
        })}
    }
}
