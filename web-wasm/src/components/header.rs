//! ヘッダーコンポーネント

use leptos::prelude::*;

/// 表示中のページ
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Dashboard,
    Scan,
}

#[component]
pub fn Header(page: ReadSignal<Page>, set_page: WriteSignal<Page>) -> impl IntoView {
    view! {
        <header class="header">
            <h1>"Kaong Ripeness Inspection"</h1>
            <nav class="nav-tabs">
                <button
                    class="tab"
                    class:active=move || page.get() == Page::Scan
                    on:click=move |_| set_page.set(Page::Scan)
                >
                    "Scan"
                </button>
                <button
                    class="tab"
                    class:active=move || page.get() == Page::Dashboard
                    on:click=move |_| set_page.set(Page::Dashboard)
                >
                    "Dashboard"
                </button>
            </nav>
        </header>
    }
}
