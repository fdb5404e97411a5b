use anyhow::Result;
use tch::{
    nn::{self, OptimizerConfig as _},
    Device, Kind, Reduction, Tensor,
};
use xray_ae::{
    loss::MaskedMse,
    model::{
        BaselineAutoencoderInit, BottleneckAutoencoderInit, Chw, DcganInit, DiscriminatorInit,
        LayerStack,
    },
};

fn small_bottleneck() -> BottleneckAutoencoderInit {
    BottleneckAutoencoderInit {
        encoder: LayerStack::new([1, 4, 8], [4, 8, 8], [3, 4, 1], [1, 2, 1]),
        decoder: LayerStack::new([8, 8, 4], [8, 4, 1], [1, 4, 3], [1, 2, 1]),
        ..Default::default()
    }
}

#[test]
fn baseline_forward_restores_shape() -> Result<()> {
    tch::manual_seed(42);
    let vs = nn::VarStore::new(Device::Cpu);
    let model = BaselineAutoencoderInit::default().build(&vs.root())?;

    let input = Tensor::rand(&[2, 1, 64, 64], (Kind::Float, Device::Cpu));
    let output = model.forward_t(&input, true)?;
    assert_eq!(output.size(), input.size());

    // tanh output range
    let max = f64::from(&output.abs().max());
    assert!(max <= 1.0);
    Ok(())
}

#[test]
fn bottleneck_forward_restores_shape() -> Result<()> {
    let init = small_bottleneck();
    let summary = init.layout()?.summary(Chw::new(1, 32, 32))?;
    assert_eq!(summary.output_shape(), Chw::new(1, 32, 32));

    let vs = nn::VarStore::new(Device::Cpu);
    let model = init.build(&vs.root())?;

    let input = Tensor::rand(&[3, 1, 32, 32], (Kind::Float, Device::Cpu));
    let (code, indices) = model.encode(&input, false)?;
    assert_eq!(code.size(), vec![3, 8, 6, 6]);
    assert_eq!(indices.len(), 2);

    let output = model.decode(&code, indices, false)?;
    assert_eq!(output.size(), input.size());

    // sigmoid output range
    assert!(f64::from(&output.min()) >= 0.0);
    assert!(f64::from(&output.max()) <= 1.0);
    Ok(())
}

#[test]
fn decoding_requires_all_indices() -> Result<()> {
    let vs = nn::VarStore::new(Device::Cpu);
    let model = small_bottleneck().build(&vs.root())?;

    let input = Tensor::rand(&[1, 1, 32, 32], (Kind::Float, Device::Cpu));
    let (code, mut indices) = model.encode(&input, false)?;
    indices.pop();
    assert!(model.decode(&code, indices, false).is_err());
    Ok(())
}

#[test]
fn training_step_reduces_loss() -> Result<()> {
    tch::manual_seed(7);
    let vs = nn::VarStore::new(Device::Cpu);
    let model = small_bottleneck().build(&vs.root())?;
    let mut opt = nn::Adam::default().build(&vs, 1e-2)?;

    let input = Tensor::rand(&[4, 1, 32, 32], (Kind::Float, Device::Cpu));
    let mask = Tensor::ones(&[4, 1, 32, 32], (Kind::Float, Device::Cpu));
    let criterion = MaskedMse::new(Reduction::Mean);

    let initial = {
        let output = model.forward_t(&input, true)?;
        let loss = criterion.forward(&output, &input, &mask)?;
        opt.backward_step(&loss);
        f64::from(&loss)
    };
    let last = (0..20).try_fold(initial, |_, _| -> Result<_> {
        let output = model.forward_t(&input, true)?;
        let loss = criterion.forward(&output, &input, &mask)?;
        opt.backward_step(&loss);
        Ok(f64::from(&loss))
    })?;

    assert!(last.is_finite());
    assert!(last < initial);
    Ok(())
}

#[test]
fn discriminator_emits_one_logit_per_image() -> Result<()> {
    let init = DcganInit::default();
    init.discriminator.check_input_shape(Chw::new(1, 64, 64))?;

    let vs = nn::VarStore::new(Device::Cpu);
    let discriminator = init.discriminator.build(&vs.root())?;
    let input = Tensor::rand(&[5, 1, 64, 64], (Kind::Float, Device::Cpu));
    let logits = discriminator.forward_t(&input, true)?;
    assert_eq!(logits.size(), vec![5]);

    let too_deep = DiscriminatorInit::default();
    assert!(too_deep.check_input_shape(Chw::new(1, 16, 16)).is_err());
    Ok(())
}
