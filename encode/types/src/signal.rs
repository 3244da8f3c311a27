/*!
    Control signals a playback loop pushes alongside its data.
*/

/**
    Out-of-band events for an encode session.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PipelineSignal {
    /**
        The input timeline jumped, as after a seek.

        Buffered audio is dropped and video waits until audio reports the
        skew again.
    */
    Flush,
    /**
        No more input will arrive. Encoders are drained and the output is
        finalized.
    */
    Eos,
}
