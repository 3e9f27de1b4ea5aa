//! 検出サービスとのWebSocketチャネル

use super::server::js_error;
use kaong_common::capture::DetectionChannel;
use kaong_common::protocol::{channel_url, ChannelEvent};
use kaong_common::Error;
use std::rc::Rc;
use wasm_bindgen::prelude::*;
use web_sys::{CloseEvent, Event, MessageEvent, WebSocket};

/// チャネルからの通知
#[derive(Debug, Clone)]
pub enum ChannelNotice {
    Connected,
    Disconnected,
    Event(ChannelEvent),
}

pub struct WsChannel {
    socket: WebSocket,
    _on_open: Closure<dyn FnMut(Event)>,
    _on_message: Closure<dyn FnMut(MessageEvent)>,
    _on_close: Closure<dyn FnMut(CloseEvent)>,
}

/// 現在のページと同じホストのチャネルURL
pub fn page_channel_url() -> Result<String, String> {
    let location = web_sys::window()
        .ok_or_else(|| "no window".to_string())?
        .location();
    let protocol = location.protocol().map_err(js_error)?;
    let host = location.host().map_err(js_error)?;
    Ok(channel_url(&protocol, &host))
}

impl WsChannel {
    /// 接続を開始する。通知は `on_notice` に届く
    pub fn connect<F>(url: &str, on_notice: F) -> Result<Self, String>
    where
        F: Fn(ChannelNotice) + 'static,
    {
        let socket = WebSocket::new(url).map_err(js_error)?;
        let on_notice = Rc::new(on_notice);

        let notice = Rc::clone(&on_notice);
        let on_open = Closure::wrap(Box::new(move |_: Event| {
            log::info!("Connected to detection channel");
            notice(ChannelNotice::Connected);
        }) as Box<dyn FnMut(Event)>);

        let notice = Rc::clone(&on_notice);
        let on_message = Closure::wrap(Box::new(move |ev: MessageEvent| {
            let Some(text) = ev.data().as_string() else {
                log::warn!("ignoring non-text channel frame");
                return;
            };
            match ChannelEvent::decode(&text) {
                Ok(event) => notice(ChannelNotice::Event(event)),
                Err(e) => log::warn!("{}", e),
            }
        }) as Box<dyn FnMut(MessageEvent)>);

        let notice = Rc::clone(&on_notice);
        let on_close = Closure::wrap(Box::new(move |_: CloseEvent| {
            log::info!("Disconnected from detection channel");
            notice(ChannelNotice::Disconnected);
        }) as Box<dyn FnMut(CloseEvent)>);

        socket.set_onopen(Some(on_open.as_ref().unchecked_ref()));
        socket.set_onmessage(Some(on_message.as_ref().unchecked_ref()));
        socket.set_onclose(Some(on_close.as_ref().unchecked_ref()));

        Ok(Self {
            socket,
            _on_open: on_open,
            _on_message: on_message,
            _on_close: on_close,
        })
    }
}

impl DetectionChannel for WsChannel {
    fn send_text(&mut self, text: &str) -> kaong_common::Result<()> {
        self.socket
            .send_with_str(text)
            .map_err(|e| Error::Capture(js_error(e)))
    }

    fn is_connected(&self) -> bool {
        self.socket.ready_state() == WebSocket::OPEN
    }

    fn disconnect(&mut self) {
        self.socket.set_onopen(None);
        self.socket.set_onmessage(None);
        self.socket.set_onclose(None);
        let _ = self.socket.close();
    }
}

impl Drop for WsChannel {
    fn drop(&mut self) {
        // 接続途中でもハンドラを外してから閉じる
        self.disconnect();
    }
}
