//! 单个 WebSocket 会话的收发循环
//!
//! 读任务按到达顺序把文本帧交给网关；写任务统一持有 socket 的写半部，
//! 同时消费会话出站队列和控制命令。任一任务结束即视为断开。
//! 读任务不会被强行中止，正在处理的帧总是执行完毕。

use application::{outbound_channel, OutboundReceiver};
use axum::body::Bytes;
use axum::extract::ws::{Message as WsMessage, WebSocket};
use domain::UserIdentity;
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};

use crate::state::AppState;

/// WebSocket 写操作命令
#[derive(Debug)]
enum WsCommand {
    SendPong(Bytes),
}

pub async fn serve(socket: WebSocket, state: AppState, identity: UserIdentity) {
    let (outbound_tx, outbound_rx) = outbound_channel();
    let session = state.gateway.open_session(&identity, outbound_tx).await;
    let user_id = session.user_id();
    let session_id = session.id();

    let (sender, mut incoming) = socket.split();
    let (cmd_tx, cmd_rx) = mpsc::channel::<WsCommand>(32);
    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

    let mut send_task = tokio::spawn(write_loop(sender, outbound_rx, cmd_rx));

    let mut recv_task = {
        let gateway = state.gateway.clone();
        let session = session.clone();
        tokio::spawn(async move {
            loop {
                // 只在等待下一帧时响应停止信号
                let next = tokio::select! {
                    _ = &mut stop_rx => break,
                    next = incoming.next() => next,
                };
                let Some(Ok(message)) = next else {
                    break;
                };
                match message {
                    WsMessage::Text(text) => gateway.handle_frame(&session, text.as_str()).await,
                    WsMessage::Binary(data) => {
                        tracing::debug!(session_id = %session.id(), len = data.len(), "ignoring binary frame");
                    }
                    WsMessage::Ping(data) => {
                        if cmd_tx.send(WsCommand::SendPong(data)).await.is_err() {
                            break;
                        }
                    }
                    WsMessage::Pong(_) => {}
                    WsMessage::Close(_) => {
                        tracing::debug!(session_id = %session.id(), "WebSocket收到关闭消息");
                        break;
                    }
                }
            }
        })
    };

    let writer_closed = tokio::select! {
        _ = &mut send_task => true,
        _ = &mut recv_task => false,
    };
    if writer_closed {
        let _ = stop_tx.send(());
        if let Err(err) = recv_task.await {
            tracing::warn!(session_id = %session_id, error = %err, "WebSocket读任务异常退出");
        }
    } else {
        send_task.abort();
    }

    state.gateway.close_session(&session).await;
    tracing::info!(user_id = %user_id, session_id = %session_id, "WebSocket连接已断开");
}

async fn write_loop(
    mut sender: SplitSink<WebSocket, WsMessage>,
    mut outbound_rx: OutboundReceiver,
    mut cmd_rx: mpsc::Receiver<WsCommand>,
) {
    loop {
        tokio::select! {
            Some(event) = outbound_rx.recv() => {
                let payload = match serde_json::to_string(&event) {
                    Ok(json) => json,
                    Err(err) => {
                        tracing::warn!(error = %err, "failed to serialize websocket payload");
                        continue;
                    }
                };
                if sender.send(WsMessage::Text(payload.into())).await.is_err() {
                    tracing::debug!("WebSocket写入失败，停止发送");
                    break;
                }
            }
            Some(cmd) = cmd_rx.recv() => {
                match cmd {
                    WsCommand::SendPong(data) => {
                        if sender.send(WsMessage::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                }
            }
            else => break,
        }
    }
}
