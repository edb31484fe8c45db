use crate::broker::BrokerError;

pub trait StatusPublisher: Send {
    fn publish_status(&mut self, xml: &str) -> Result<(), BrokerError>;
}

impl<T: StatusPublisher + ?Sized> StatusPublisher for Box<T> {
    fn publish_status(&mut self, xml: &str) -> Result<(), BrokerError> {
        (**self).publish_status(xml)
    }
}
