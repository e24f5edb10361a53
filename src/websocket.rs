/// WebSocket endpoint that drives a shared session
use actix::prelude::*;
use actix_web_actors::ws;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::export::now_millis;
use crate::messages::{ClientMessage, ServerMessage};
use crate::session::Session;
use crate::value::Record;

/// How often heartbeat pings are sent
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
/// How long before lack of client response causes a timeout
const CLIENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared state for all WebSocket connections
pub struct AppState {
    pub session: Arc<Mutex<Session>>,
}

impl AppState {
    pub fn new(session: Session) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
        }
    }
}

/// WebSocket connection actor
pub struct SessionWebSocket {
    hb: Instant,
    state: actix_web::web::Data<AppState>,
}

impl SessionWebSocket {
    pub fn new(state: actix_web::web::Data<AppState>) -> Self {
        Self {
            hb: Instant::now(),
            state,
        }
    }

    fn hb(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.hb) > CLIENT_TIMEOUT {
                println!("WebSocket Client heartbeat failed, disconnecting!");
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    fn handle_client_message(&mut self, msg: ClientMessage, ctx: &mut ws::WebsocketContext<Self>) {
        let mut session = self.state.session.lock().unwrap();

        match msg {
            ClientMessage::Load => match session.load() {
                Ok(report) => {
                    let response = ServerMessage::Loaded {
                        table: report.table,
                        all_tables: report.all_tables,
                        rows: report.rows,
                        columns: report.columns,
                        overlay_applied: report.overlay_applied,
                        focal_missing: report.focal_missing,
                    };
                    ctx.text(serde_json::to_string(&response).unwrap());
                    send_page(&session, ctx);
                }
                Err(err) => send_error(err.to_string(), ctx),
            },

            ClientMessage::Query { sql } => match session.execute(&sql) {
                Ok(result) => {
                    let response = ServerMessage::ResultData {
                        columns: result.columns.clone(),
                        rows: result
                            .rows
                            .iter()
                            .map(|row| row.iter().map(|value| value.to_json()).collect())
                            .collect(),
                    };
                    ctx.text(serde_json::to_string(&response).unwrap());
                }
                Err(err) => send_error(err.to_string(), ctx),
            },

            ClientMessage::SetSearch { term } => {
                session.set_search_term(&term);
                send_page(&session, ctx);
            }

            ClientMessage::SetFilter { column, value } => {
                session.set_filter(&column, &value);
                send_page(&session, ctx);
            }

            ClientMessage::ClearFilters => {
                session.clear_filters();
                send_page(&session, ctx);
            }

            ClientMessage::SortBy { column } => {
                session.sort_by(&column);
                send_page(&session, ctx);
            }

            ClientMessage::SetPage { page } => {
                session.set_page(page);
                send_page(&session, ctx);
            }

            ClientMessage::SetPageSize { size } => match session.set_page_size(size) {
                Ok(()) => send_page(&session, ctx),
                Err(err) => send_error(err.to_string(), ctx),
            },

            ClientMessage::Page => send_page(&session, ctx),

            ClientMessage::Options => {
                let options = session.filter_options();
                let response = ServerMessage::FilterOptions {
                    categories: options.categories,
                    statuses: options.statuses,
                    years: options.years,
                };
                ctx.text(serde_json::to_string(&response).unwrap());
            }

            ClientMessage::Summary => {
                let stats = session.summary();
                let response = ServerMessage::Summary {
                    total: stats.total,
                    completed: stats.completed,
                    pending: stats.pending,
                    todo: stats.todo,
                    errors: stats.errors,
                    other: stats.other,
                    with_transcript: stats.with_transcript,
                    without_transcript: stats.without_transcript,
                    categories: stats.categories,
                    min_year: stats.min_year,
                    max_year: stats.max_year,
                    completion_rate: stats.completion_rate,
                };
                ctx.text(serde_json::to_string(&response).unwrap());
            }

            ClientMessage::EditTranscript { id, transcript } => {
                match session.commit_transcript(id, &transcript) {
                    Ok(record) => {
                        let response = ServerMessage::TranscriptSaved {
                            id,
                            record: record_to_json(&record),
                        };
                        ctx.text(serde_json::to_string(&response).unwrap());
                        send_page(&session, ctx);
                    }
                    Err(err) => send_error(err.to_string(), ctx),
                }
            }

            ClientMessage::ClearChanges => match session.clear_changes() {
                Ok(report) => {
                    let response = ServerMessage::ChangesCleared { rows: report.rows };
                    ctx.text(serde_json::to_string(&response).unwrap());
                    send_page(&session, ctx);
                }
                Err(err) => send_error(err.to_string(), ctx),
            },

            ClientMessage::ExportCsv => {
                let export = session.export_csv(now_millis());
                let response = ServerMessage::CsvReady {
                    filename: export.filename,
                    content: export.content,
                };
                ctx.text(serde_json::to_string(&response).unwrap());
            }
        }
    }
}

impl Actor for SessionWebSocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.hb(ctx);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for SessionWebSocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.hb = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(client_msg) => {
                        self.handle_client_message(client_msg, ctx);
                    }
                    Err(e) => {
                        send_error(format!("Invalid message format: {}", e), ctx);
                    }
                }
            }
            Ok(ws::Message::Binary(_)) => {
                println!("Unexpected binary message");
            }
            Ok(ws::Message::Close(reason)) => {
                ctx.close(reason);
                ctx.stop();
            }
            _ => ctx.stop(),
        }
    }
}

/// Render the session's current page as a PageData message
fn send_page(session: &Session, ctx: &mut ws::WebsocketContext<SessionWebSocket>) {
    let page = session.current_page();
    let response = ServerMessage::PageData {
        columns: session.store().columns().to_vec(),
        records: page.records.iter().map(record_to_json).collect(),
        page: page.page,
        total_pages: page.total_pages,
        total_records: page.total_records,
        start: page.start,
        end: page.end,
    };
    ctx.text(serde_json::to_string(&response).unwrap());
}

fn send_error(message: String, ctx: &mut ws::WebsocketContext<SessionWebSocket>) {
    let response = ServerMessage::Error { message };
    ctx.text(serde_json::to_string(&response).unwrap());
}

/// Convert a record to JSON
fn record_to_json(record: &Record) -> HashMap<String, JsonValue> {
    record
        .iter()
        .map(|(column, value)| (column.clone(), value.to_json()))
        .collect()
}
