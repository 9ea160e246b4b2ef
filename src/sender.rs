use crate::connection::Command;
use ds_protocol::Message;
use ds_records::RecordSender;
use tokio::sync::mpsc;

/// Routes a [`ds_records::Record`]'s outbound messages into the
/// Connection Core's command channel, so a record send competes for the
/// same single logical execution context as everything else. The send
/// itself is synchronous and non-blocking — it just enqueues.
pub(crate) struct CommandSender {
    pub tx: mpsc::UnboundedSender<Command>,
}

impl RecordSender for CommandSender {
    fn send(&self, message: Message) {
        let _ = self.tx.send(Command::SendMessage(message));
    }
}
