use crate::channel::{ChannelError, ChannelManager, LogBuffer, LogChannel};
use serde_json::{Map, Value};

/// Remote-side template for one job run: prepare the channel, run the job
/// body against a fresh per-attempt buffer, then ship the buffer whether
/// the body succeeded or failed. The returned value travels back through
/// the substrate but the invoking side never trusts it; the shipped lines
/// are the only durable record.
///
/// Setup failure is fatal and ships nothing, since without a prepared
/// channel there is nowhere for evidence to go.
pub fn run_shipped<F>(
    manager: &ChannelManager<'_>,
    channel: &LogChannel,
    payload: &Map<String, Value>,
    job: F,
) -> Result<Value, ChannelError>
where
    F: FnOnce(&mut LogBuffer, &Map<String, Value>) -> Result<Value, String>,
{
    manager.prepare_channel(&channel.group, &channel.stream)?;

    let mut buffer = LogBuffer::new();
    buffer.info("log stream created");
    buffer.info("Start Request");

    let result = job(&mut buffer, payload);
    match &result {
        Ok(_) => buffer.info("End Request"),
        Err(reason) => buffer.error(reason),
    }

    manager.ship_buffer(&channel.group, &channel.stream, &buffer)?;

    Ok(match result {
        Ok(value) => value,
        Err(reason) => Value::String(reason),
    })
}
