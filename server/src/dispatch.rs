//! Packet dispatch.
//!
//! [`PacketDispatcher::dispatch`] looks up the handler for a packet's op
//! code and runs it. Whatever the handler does (return an error, panic),
//! the failure ends with a log line: the connection stays open and the next
//! packet is dispatched normally. Packets without a handler go to an
//! [`UnknownPacketHandler`].

use channel_shared::{op, Packet};
use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Once};

use crate::handler::HandlerRegistry;

/// Connection context handed to handlers.
pub trait Connection: Send + Sync + 'static {
    fn connection_id(&self) -> u64;

    /// Ask the transport to close this connection after the current packet.
    fn disconnect(&self);
}

/// What happens to packets nobody handles.
pub trait UnknownPacketHandler<C>: Send + Sync {
    fn unknown_packet(&self, client: &C, packet: &Packet);
}

/// Default fallback: log the op as unimplemented and dump the packet.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogUnimplemented;

impl<C: Connection> UnknownPacketHandler<C> for LogUnimplemented {
    fn unknown_packet(&self, client: &C, packet: &Packet) {
        log_unimplemented(client, packet);
    }
}

/// Strict fallback: log like [`LogUnimplemented`], then drop the connection.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisconnectOnUnknown;

impl<C: Connection> UnknownPacketHandler<C> for DisconnectOnUnknown {
    fn unknown_packet(&self, client: &C, packet: &Packet) {
        log_unimplemented(client, packet);
        tracing::info!(
            connection = client.connection_id(),
            "Disconnecting after unknown op 0x{:04X}",
            packet.op()
        );
        client.disconnect();
    }
}

fn log_unimplemented<C: Connection>(client: &C, packet: &Packet) {
    tracing::warn!(
        target: "unimplemented",
        connection = client.connection_id(),
        "Handler for '0x{:04X}'",
        packet.op()
    );
    tracing::debug!("{}", packet);
}

/// Result of dispatching one packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A handler ran and returned `Ok`.
    Handled,
    /// A handler ran and failed; the failure was logged.
    Failed,
    /// No handler; the fallback ran.
    Unknown,
}

pub struct PacketDispatcher<C> {
    registry: Arc<HandlerRegistry<C>>,
    fallback: Box<dyn UnknownPacketHandler<C>>,
}

impl<C: Connection> PacketDispatcher<C> {
    pub fn new(registry: Arc<HandlerRegistry<C>>) -> Self {
        Self::with_fallback(registry, LogUnimplemented)
    }

    pub fn with_fallback(
        registry: Arc<HandlerRegistry<C>>,
        fallback: impl UnknownPacketHandler<C> + 'static,
    ) -> Self {
        Self {
            registry,
            fallback: Box::new(fallback),
        }
    }

    /// Run the handler for `packet`, or the fallback if there is none.
    pub fn dispatch(&self, client: &C, packet: &Packet) -> DispatchOutcome {
        let Some(entry) = self.registry.get(packet.op()) else {
            self.fallback.unknown_packet(client, packet);
            return DispatchOutcome::Unknown;
        };

        install_panic_hook();
        let result = {
            let _scope = HandlerScope::enter();
            panic::catch_unwind(AssertUnwindSafe(|| entry.handler.handle(client, packet)))
        };

        match result {
            Ok(Ok(())) => DispatchOutcome::Handled,
            Ok(Err(err)) => {
                tracing::error!(
                    connection = client.connection_id(),
                    handler = entry.name,
                    "There has been a problem while handling '0x{:04X}' ({}): {:?}",
                    packet.op(),
                    op::name(packet.op()).unwrap_or("?"),
                    err
                );
                DispatchOutcome::Failed
            }
            Err(payload) => {
                let report = LAST_PANIC.take();
                let (location, backtrace) = match &report {
                    Some(report) => (report.location.as_str(), report.backtrace.to_string()),
                    None => ("<unknown>", String::new()),
                };
                tracing::error!(
                    connection = client.connection_id(),
                    handler = entry.name,
                    "Handler panicked while handling '0x{:04X}' ({}) at {}: {}\n{}",
                    packet.op(),
                    op::name(packet.op()).unwrap_or("?"),
                    location,
                    panic_message(payload.as_ref()),
                    backtrace
                );
                DispatchOutcome::Failed
            }
        }
    }
}

struct PanicReport {
    location: String,
    backtrace: Backtrace,
}

thread_local! {
    static IN_HANDLER: Cell<bool> = const { Cell::new(false) };
    static LAST_PANIC: RefCell<Option<PanicReport>> = const { RefCell::new(None) };
}

static PANIC_HOOK: Once = Once::new();

/// Panics raised inside a handler are recorded for the dispatcher's log line
/// instead of going to stderr. Panics anywhere else reach the previous hook.
fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if !IN_HANDLER.get() {
                previous(info);
                return;
            }
            let location = info
                .location()
                .map(|l| l.to_string())
                .unwrap_or_else(|| "<unknown>".to_string());
            LAST_PANIC.set(Some(PanicReport {
                location,
                backtrace: Backtrace::force_capture(),
            }));
        }));
    });
}

/// Marks the current thread as running a handler until dropped.
struct HandlerScope(bool);

impl HandlerScope {
    fn enter() -> Self {
        Self(IN_HANDLER.replace(true))
    }
}

impl Drop for HandlerScope {
    fn drop(&mut self) {
        IN_HANDLER.set(self.0);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{HandlerResult, PacketHandler};
    use std::io;
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TestConn {
        closed: AtomicBool,
    }

    impl Connection for TestConn {
        fn connection_id(&self) -> u64 {
            1
        }

        fn disconnect(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    /// Collects formatted log output for assertions.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn with_captured_logs<R>(f: impl FnOnce() -> R) -> (R, String) {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .finish();
        let result = tracing::subscriber::with_default(subscriber, f);
        (result, buffer.contents())
    }

    fn counting(counter: &Arc<AtomicU32>) -> impl PacketHandler<TestConn> + 'static {
        let counter = Arc::clone(counter);
        move |_: &TestConn, _: &Packet| -> HandlerResult {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn failing(_: &TestConn, packet: &Packet) -> HandlerResult {
        packet.reader().get_byte()?;
        Ok(())
    }

    fn panicking(_: &TestConn, _: &Packet) -> HandlerResult {
        panic!("boom");
    }

    #[test]
    fn dispatch_runs_registered_handler() {
        let registry = Arc::new(HandlerRegistry::<TestConn>::new());
        let hits = Arc::new(AtomicU32::new(0));
        registry.register(0x10, "count", counting(&hits));
        let dispatcher = PacketDispatcher::new(registry);

        let outcome = dispatcher.dispatch(&TestConn::default(), &Packet::new(0x10, 1));
        assert_eq!(outcome, DispatchOutcome::Handled);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn overwritten_handler_is_the_only_one_invoked() {
        let registry = Arc::new(HandlerRegistry::<TestConn>::new());
        let old_hits = Arc::new(AtomicU32::new(0));
        let new_hits = Arc::new(AtomicU32::new(0));

        let (_, logs) = with_captured_logs(|| {
            registry.register(0x20, "old", counting(&old_hits));
            registry.register(0x20, "new", counting(&new_hits));
        });
        assert_eq!(logs.matches("Overwriting handler").count(), 1);
        assert!(logs.contains("'old' replaced by 'new'"));

        let dispatcher = PacketDispatcher::new(registry);
        dispatcher.dispatch(&TestConn::default(), &Packet::new(0x20, 1));
        assert_eq!(old_hits.load(Ordering::SeqCst), 0);
        assert_eq!(new_hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unknown_op_goes_to_fallback_once() {
        struct CountingFallback(Arc<AtomicU32>);

        impl UnknownPacketHandler<TestConn> for CountingFallback {
            fn unknown_packet(&self, _: &TestConn, _: &Packet) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let registry = Arc::new(HandlerRegistry::<TestConn>::new());
        let calls = Arc::new(AtomicU32::new(0));
        let dispatcher =
            PacketDispatcher::with_fallback(Arc::clone(&registry), CountingFallback(calls.clone()));

        let outcome = dispatcher.dispatch(&TestConn::default(), &Packet::new(0x5000, 1));
        assert_eq!(outcome, DispatchOutcome::Unknown);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn default_fallback_logs_op_and_packet() {
        let registry = Arc::new(HandlerRegistry::<TestConn>::new());
        let dispatcher = PacketDispatcher::new(Arc::clone(&registry));
        let conn = TestConn::default();

        let (outcome, logs) = with_captured_logs(|| {
            dispatcher.dispatch(&conn, &Packet::builder(0x5000, 1).byte(3).build())
        });
        assert_eq!(outcome, DispatchOutcome::Unknown);
        assert!(logs.contains("0x5000"));
        assert!(logs.contains("unimplemented"));
        assert!(logs.contains("Op: 00005000"));
        assert!(!conn.closed.load(Ordering::SeqCst));
        assert!(registry.is_empty());
    }

    #[test]
    fn strict_fallback_disconnects() {
        let registry = Arc::new(HandlerRegistry::<TestConn>::new());
        let dispatcher = PacketDispatcher::with_fallback(registry, DisconnectOnUnknown);
        let conn = TestConn::default();

        dispatcher.dispatch(&conn, &Packet::new(0x5000, 1));
        assert!(conn.closed.load(Ordering::SeqCst));
    }

    #[test]
    fn failing_handler_does_not_affect_later_dispatches() {
        let registry = Arc::new(HandlerRegistry::<TestConn>::new());
        let hits = Arc::new(AtomicU32::new(0));
        registry.register(0x30, "failing", failing);
        registry.register(0x31, "count", counting(&hits));
        let dispatcher = PacketDispatcher::new(registry);
        let conn = TestConn::default();

        let (outcome, logs) =
            with_captured_logs(|| dispatcher.dispatch(&conn, &Packet::new(0x30, 1)));
        assert_eq!(outcome, DispatchOutcome::Failed);
        assert!(logs.contains("0x0030"));
        assert!(logs.contains("no field at index 0"));

        // Same op again, then an unrelated one.
        assert_eq!(
            dispatcher.dispatch(&conn, &Packet::builder(0x30, 1).byte(0).build()),
            DispatchOutcome::Handled
        );
        assert_eq!(
            dispatcher.dispatch(&conn, &Packet::new(0x31, 1)),
            DispatchOutcome::Handled
        );
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(!conn.closed.load(Ordering::SeqCst));
    }

    #[test]
    fn panicking_handler_is_contained() {
        let registry = Arc::new(HandlerRegistry::<TestConn>::new());
        let hits = Arc::new(AtomicU32::new(0));
        registry.register(0x40, "panicking", panicking);
        registry.register(0x41, "count", counting(&hits));
        let dispatcher = PacketDispatcher::new(registry);
        let conn = TestConn::default();

        let (outcome, logs) =
            with_captured_logs(|| dispatcher.dispatch(&conn, &Packet::new(0x40, 1)));
        assert_eq!(outcome, DispatchOutcome::Failed);
        assert!(logs.contains("boom"));
        assert!(logs.contains("0x0040"));
        // Where `panicking` panicked.
        assert!(logs.contains("src/dispatch.rs:"));

        assert_eq!(
            dispatcher.dispatch(&conn, &Packet::new(0x41, 1)),
            DispatchOutcome::Handled
        );
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn handlers_may_register_during_dispatch() {
        let registry = Arc::new(HandlerRegistry::<TestConn>::new());
        let inner = Arc::clone(&registry);
        registry.register(
            0x50,
            "installer",
            move |_: &TestConn, _: &Packet| -> HandlerResult {
                inner.register(0x51, "installed", |_: &TestConn, _: &Packet| -> HandlerResult {
                    Ok(())
                });
                Ok(())
            },
        );
        let dispatcher = PacketDispatcher::new(Arc::clone(&registry));
        let conn = TestConn::default();

        assert_eq!(dispatcher.dispatch(&conn, &Packet::new(0x51, 1)), DispatchOutcome::Unknown);
        assert_eq!(dispatcher.dispatch(&conn, &Packet::new(0x50, 1)), DispatchOutcome::Handled);
        assert_eq!(dispatcher.dispatch(&conn, &Packet::new(0x51, 1)), DispatchOutcome::Handled);
    }

    #[test]
    fn concurrent_dispatch_from_many_connections() {
        let registry = Arc::new(HandlerRegistry::<TestConn>::new());
        let hits = Arc::new(AtomicU32::new(0));
        registry.register(0x60, "count", counting(&hits));
        registry.register(0x61, "failing", failing);
        let dispatcher = Arc::new(PacketDispatcher::new(registry));

        std::thread::scope(|s| {
            for _ in 0..8 {
                let dispatcher = Arc::clone(&dispatcher);
                s.spawn(move || {
                    let conn = TestConn::default();
                    for _ in 0..100 {
                        dispatcher.dispatch(&conn, &Packet::new(0x61, 1));
                        dispatcher.dispatch(&conn, &Packet::new(0x60, 1));
                    }
                });
            }
        });
        assert_eq!(hits.load(Ordering::SeqCst), 800);
    }
}
