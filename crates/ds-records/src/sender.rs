use ds_protocol::Message;

/// Non-owning handle a [`crate::Record`] uses to send messages through
/// whatever owns the actual connection, breaking the cyclic reference a
/// naive design would create between the Connection Core and its
/// Records: the Record never holds a reference back to the Connection
/// Core, only to this narrow interface.
pub trait RecordSender: Send + Sync {
    fn send(&self, message: Message);
}
