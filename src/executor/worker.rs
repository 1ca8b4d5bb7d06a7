use std::{
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use parking_lot::MutexGuard;
use tracing::{debug, error, info};

use super::pool::{Command, ExecutorState, PoolState, Shared};
use crate::sync::{panic_message, Deadline};

/// Тело рабочего потока: выполнить первую команду, затем брать следующие,
/// пока пул активен и работа приходит раньше, чем истечёт `keep_alive`.
pub(super) fn run(
    shared: Arc<Shared>,
    first: Command,
) {
    let mut command = first;
    loop {
        execute_contained(command);

        let mut state = shared.monitor.lock();
        match next_command(&shared, &mut state) {
            Some(next) => command = next,
            None => {
                state.workers -= 1;
                if state.workers == 0 && state.state == ExecutorState::ShuttingDown {
                    state.state = ExecutorState::Terminated;
                    info!("executor terminated");
                }
                shared.monitor.notify_all();
                debug!(workers = state.workers, "worker exited");
                return;
            }
        }
    }
}

/// Следующая команда для рабочего или `None`, если ему пора завершаться.
fn next_command(
    shared: &Shared,
    state: &mut MutexGuard<'_, PoolState>,
) -> Option<Command> {
    if state.state != ExecutorState::Active {
        return None;
    }

    // Сначала ждущие отправители, в порядке прихода.
    if let Some(submission) = state.waiting.pop_front() {
        shared.monitor.notify_all();
        return Some(submission.command);
    }

    state.idle += 1;
    let deadline = Deadline::new(shared.keep_alive);
    shared
        .monitor
        .wait_until(state, &deadline, &shared.never, |state| {
            !state.ready.is_empty() || state.state != ExecutorState::Active
        });

    // Переданную команду уже учёл отправитель, уменьшив `idle`.
    if let Some(command) = state.ready.pop_front() {
        return Some(command);
    }

    state.idle -= 1;
    None
}

/// Выполняет команду без замка пула, перехватывая панику.
fn execute_contained(command: Command) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(command)) {
        error!(
            panic = %panic_message(payload.as_ref()),
            "command panicked on worker thread"
        );
    }
}
