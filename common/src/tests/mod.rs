mod test_ghost;
mod test_session_record;
