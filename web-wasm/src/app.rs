//! メインアプリケーションコンポーネント

use crate::components::{
    capture_panel::ScanPage,
    dashboard::DashboardPage,
    header::{Header, Page},
    notifications::{Notifications, Notifier},
};
use leptos::prelude::*;

#[component]
pub fn App() -> impl IntoView {
    provide_context(Notifier::new());
    let (page, set_page) = signal(Page::Dashboard);

    view! {
        <div class="app">
            <Header page=page set_page=set_page />
            <Notifications />
            <main class="main-content">
                {move || match page.get() {
                    Page::Dashboard => view! { <DashboardPage /> }.into_any(),
                    Page::Scan => view! { <ScanPage /> }.into_any(),
                }}
            </main>
        </div>
    }
}
