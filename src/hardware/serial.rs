//! # Terminal Pump Module / 终端泵模块
//!
//! One background task per connected serial terminal, draining received lines
//! into the channel's session log file and onto the event bus. The pump runs
//! for the whole session, so boot chatter between tests is captured too.
//!
//! 每个已连接串口终端一个后台任务，将接收到的行排入该通道的会话日志
//! 文件并发布到事件总线。泵在整个会话期间运行，因此测试之间的启动
//! 输出也会被捕获。

use chrono::Local;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use crate::core::controller::EventBus;
use crate::core::models::EngineEvent;
use crate::hardware::traits::Terminal;
use crate::infra::logging::LogSink;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Spawns the pump for one terminal. Ends when `shutdown` fires or the
/// terminal starts failing reads.
pub fn spawn_terminal_pump(
    terminal: Arc<dyn Terminal>,
    sink: LogSink,
    events: Arc<EventBus>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let channel = terminal.name().to_string();
        'pump: loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break 'pump,
                _ = sleep(POLL_INTERVAL) => {}
            }

            // Drain everything buffered before sleeping again so a chatty
            // device cannot outrun the poll interval.
            loop {
                match terminal.try_read_line() {
                    Ok(Some(line)) => {
                        let stamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
                        sink.emit(format!("[{stamp}] {line}"));
                        events.publish(EngineEvent::LogLine {
                            channel: channel.clone(),
                            line,
                        });
                    }
                    Ok(None) => break,
                    Err(e) => {
                        let stamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
                        sink.emit(format!("[{stamp}] <read failed: {e:#}>"));
                        break 'pump;
                    }
                }
            }
        }
    })
}
