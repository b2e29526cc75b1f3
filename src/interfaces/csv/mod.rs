pub mod cart_event_reader;
pub mod cart_writer;
pub mod ticket_writer;
