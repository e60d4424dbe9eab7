use std::sync::Arc;

use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{sleep_until, Instant},
};

use crate::AuthSession;

/// User input that counts as activity
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ActivityEvent {
    Pointer,
    Key,
    Scroll,
    Touch,
}

/// Signs the current user out after a period without any activity event.
///
/// The timer runs in its own task, armed whenever someone is signed in and
/// pushed back by every event sent through `activity`.
pub struct SessionTimeout {
    events: mpsc::UnboundedSender<ActivityEvent>,
    task: JoinHandle<()>,
}

impl SessionTimeout {
    pub fn start(session: Arc<AuthSession>) -> SessionTimeout {
        let (events, receiver) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(session, receiver));
        SessionTimeout { events, task }
    }

    pub fn activity(&self, event: ActivityEvent) {
        // The task only stops when we do, so the receiver is still there
        let _ = self.events.send(event);
    }

    pub fn stop(self) {
        self.task.abort();
    }
}

impl Drop for SessionTimeout {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(session: Arc<AuthSession>, mut events: mpsc::UnboundedReceiver<ActivityEvent>) {
    let timeout = session.config().inactivity_timeout();
    let mut auth = session.watch();
    loop {
        let current = auth.borrow_and_update().clone();
        let Some(user) = current else {
            // Nobody to sign out: wait for a sign-in, ignoring activity meanwhile
            tokio::select! {
                res = auth.changed() => if res.is_err() { return },
                ev = events.recv() => if ev.is_none() { return },
            }
            continue;
        };

        let mut deadline = Instant::now() + timeout;
        loop {
            tokio::select! {
                _ = sleep_until(deadline) => {
                    tracing::info!(user = %user.id, ?timeout, "signing out inactive user");
                    if let Err(err) = session.sign_out().await {
                        tracing::error!(?err, "failed signing out inactive user");
                    }
                    break;
                }
                ev = events.recv() => match ev {
                    None => return,
                    Some(ev) => {
                        tracing::trace!(?ev, "user activity");
                        deadline = Instant::now() + timeout;
                        session.record_activity(&user, chrono::Utc::now());
                    }
                },
                res = auth.changed() => {
                    if res.is_err() {
                        return;
                    }
                    // Signed out or switched user: start over with the new state
                    break;
                }
            }
        }
    }
}
