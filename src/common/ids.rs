/// Random 128-bit identifier as 32 lower-case hex digits.
pub(crate) fn new_id() -> String {
    hex::encode(rand::random::<u128>().to_be_bytes())
}
